// 長時間操作ラッパー
//
// 任意のエンジン呼び出しにキャンセルトークン、実行モード、一度だけ書き込める結果スロットを付与します。
// Scriptモードでは必ずスクリプト専用の経路に振り分けるため、外部状態は変更されません。

use crate::core::error::OperationError;
use crate::core::operation::{
    CancellationToken, OperationId, OperationOutcome, ResultSlot, TaskExecutionMode,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// キャンセル可能な長時間操作
#[async_trait]
pub trait LongRunningOperation: Send + Sync {
    /// 操作の結果
    type Output: Send;

    /// ログとエラーに使う操作名
    fn name(&self) -> String;

    /// 外部状態を変更する経路
    async fn execute(&self, token: &CancellationToken) -> Result<Self::Output, OperationError>;

    /// 外部状態を変更せずにスクリプトやサマリーだけを作る経路
    async fn script(&self, token: &CancellationToken) -> Result<Self::Output, OperationError>;
}

/// 操作を実行して結果に変換
///
/// 開始前にトークンを確認し、キャンセル済みであれば操作を呼び出さずに `Cancelled` を返します。
/// 失敗は操作名を付けて `Failed` として報告されます。
///
/// # Arguments
///
/// * `operation` - 実行する操作
/// * `token` - キャンセルトークン
/// * `mode` - 実行モード
pub async fn run<O>(
    operation: &O,
    token: &CancellationToken,
    mode: TaskExecutionMode,
) -> OperationOutcome<O::Output>
where
    O: LongRunningOperation + ?Sized,
{
    let name = operation.name();
    if token.is_cancelled() {
        info!(operation = %name, "Operation cancelled before start");
        return OperationOutcome::Cancelled;
    }

    debug!(operation = %name, mode = %mode, "Operation started");
    let result = match mode {
        TaskExecutionMode::Execute => operation.execute(token).await,
        TaskExecutionMode::Script => operation.script(token).await,
    };

    match result {
        Ok(output) => {
            debug!(operation = %name, "Operation succeeded");
            OperationOutcome::Succeeded(output)
        }
        Err(OperationError::Cancelled) => {
            info!(operation = %name, "Operation cancelled");
            OperationOutcome::Cancelled
        }
        Err(OperationError::Failed(err)) => {
            warn!(operation = %name, error = %err, "Operation failed");
            OperationOutcome::Failed(err.with_context(name))
        }
    }
}

/// 識別子付きの操作
///
/// キャンセル要求と結果スロットを1つにまとめます。結果は一度だけ設定され、
/// 完了後のキャンセル要求は何もしません。
#[derive(Debug)]
pub struct Operation<T> {
    id: OperationId,
    mode: TaskExecutionMode,
    token: CancellationToken,
    slot: ResultSlot<OperationOutcome<T>>,
}

impl<T> Operation<T> {
    pub fn new(id: OperationId, mode: TaskExecutionMode) -> Self {
        Self::with_token(id, mode, CancellationToken::new())
    }

    /// 呼び出し側のトークンを共有する操作を作成
    ///
    /// どちらからキャンセルしても同じ操作がキャンセルされます。
    pub fn with_token(id: OperationId, mode: TaskExecutionMode, token: CancellationToken) -> Self {
        Self {
            id,
            mode,
            token,
            slot: ResultSlot::new(),
        }
    }

    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn mode(&self) -> TaskExecutionMode {
        self.mode
    }

    /// 操作に渡すトークン
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// キャンセルを要求
    ///
    /// # Returns
    ///
    /// 要求が受け付けられた場合はtrue。完了済みの操作ではfalse
    pub fn cancel(&self) -> bool {
        if self.slot.is_filled() {
            debug!(operation_id = %self.id, "Cancel ignored for completed operation");
            return false;
        }
        self.token.cancel();
        true
    }

    /// 完了していれば結果を返す
    pub fn outcome(&self) -> Option<&OperationOutcome<T>> {
        self.slot.get()
    }

    pub fn is_completed(&self) -> bool {
        self.slot.is_filled()
    }
}

impl<T: Send> Operation<T> {
    /// 操作を実行して結果スロットに書き込む
    ///
    /// 既に完了している場合は再実行せず、最初の結果を返します。
    pub async fn run<O>(&self, operation: &O) -> &OperationOutcome<T>
    where
        O: LongRunningOperation<Output = T> + ?Sized,
    {
        if let Some(outcome) = self.slot.get() {
            return outcome;
        }
        let outcome = run(operation, &self.token, self.mode).await;
        debug!(operation_id = %self.id, "Operation completed");
        self.slot.fill(outcome)
    }

    /// 操作を実行し、結果スロットの値を取り出す
    pub async fn complete<O>(self, operation: &O) -> OperationOutcome<T>
    where
        O: LongRunningOperation<Output = T> + ?Sized,
    {
        self.run(operation).await;
        self.slot.into_inner().unwrap_or(OperationOutcome::Cancelled)
    }
}
