// 長時間操作の共通モデル
//
// 操作ID、実行モード、協調的キャンセルトークン、
// 一度だけ書き込める結果スロットを提供します。

use crate::core::error::{CompareError, OperationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// 操作ID
///
/// レジストリが採番する不透明な識別子。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// 連番から操作IDを作成
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("op-{}", sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 実行モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskExecutionMode {
    /// 実際に外部状態を変更する
    #[default]
    Execute,
    /// スクリプトを生成するだけで外部状態は変更しない
    Script,
}

impl TaskExecutionMode {
    pub fn is_script(&self) -> bool {
        matches!(self, TaskExecutionMode::Script)
    }
}

impl fmt::Display for TaskExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskExecutionMode::Execute => write!(f, "execute"),
            TaskExecutionMode::Script => write!(f, "script"),
        }
    }
}

/// 協調的キャンセルトークン
///
/// 複製は同じフラグを共有します。実行中のプロバイダー呼び出しを
/// 中断することはできず、チェックポイントでのみ検知されます。
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// キャンセルを要求
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// キャンセルが要求されているか
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// チェックポイント
    ///
    /// # Returns
    ///
    /// キャンセルが要求されていれば `OperationError::Cancelled`
    pub fn check(&self) -> Result<(), OperationError> {
        if self.is_cancelled() {
            Err(OperationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// 操作の最終結果
///
/// キャンセルは失敗とは区別して報告されます。
#[derive(Debug, Clone)]
pub enum OperationOutcome<T> {
    Succeeded(T),
    Failed(CompareError),
    Cancelled,
}

impl<T> OperationOutcome<T> {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, OperationOutcome::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, OperationOutcome::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationOutcome::Cancelled)
    }

    /// 成功時の値を取得
    pub fn succeeded(self) -> Option<T> {
        match self {
            OperationOutcome::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    /// 失敗時のエラーを取得
    pub fn error(&self) -> Option<&CompareError> {
        match self {
            OperationOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationOutcome<U> {
        match self {
            OperationOutcome::Succeeded(value) => OperationOutcome::Succeeded(f(value)),
            OperationOutcome::Failed(err) => OperationOutcome::Failed(err),
            OperationOutcome::Cancelled => OperationOutcome::Cancelled,
        }
    }
}

impl<T> From<Result<T, OperationError>> for OperationOutcome<T> {
    fn from(result: Result<T, OperationError>) -> Self {
        match result {
            Ok(value) => OperationOutcome::Succeeded(value),
            Err(OperationError::Cancelled) => OperationOutcome::Cancelled,
            Err(OperationError::Failed(err)) => OperationOutcome::Failed(err),
        }
    }
}

/// 一度だけ書き込める結果スロット
///
/// 完了またはキャンセル時に一度だけ設定され、以降の書き込みは無視されます。
#[derive(Debug)]
pub struct ResultSlot<T> {
    cell: OnceLock<T>,
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }
}

impl<T> ResultSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を設定
    ///
    /// # Returns
    ///
    /// 初回の書き込みであればtrue
    pub fn set(&self, value: T) -> bool {
        self.cell.set(value).is_ok()
    }

    /// 未設定であれば値を設定し、スロットの値を返す
    ///
    /// 既に設定済みの場合、渡した値は破棄されます。
    pub fn fill(&self, value: T) -> &T {
        self.cell.get_or_init(|| value)
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_filled(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn into_inner(self) -> Option<T> {
        self.cell.into_inner()
    }
}
