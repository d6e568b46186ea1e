// エラー型定義
//
// 比較・スクリプト生成・発行で使用されるエラー型を提供します。
// キャンセルはエラーではないため、ここには含めず OperationError / OperationOutcome で表現します。

use thiserror::Error;

/// スキーマ比較エラー
///
/// エンジンが返すエラーの分類。プロバイダーのエラーは握りつぶさず、
/// `Context` で操作IDやエンドポイントの情報を付けて伝搬します。
#[derive(Debug, Clone, Error)]
pub enum CompareError {
    /// エンドポイントの入力が不正、または不足している
    #[error("Configuration error: {message}")]
    Configuration {
        /// エラーメッセージ
        message: String,
    },

    /// パッケージの読み書きの失敗
    #[error("I/O error: {path} (cause: {cause})")]
    Io {
        /// 対象のパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// 比較プロバイダー内部の失敗（差分・スクリプト化・適用）
    #[error("Provider error: {message}")]
    Provider {
        /// プロバイダーのメッセージ
        message: String,
    },

    /// 古い、または不正な差分エントリの参照
    #[error("Diff entry not found: {entry}")]
    EntryNotFound {
        /// 見つからなかったエントリの表示名
        entry: String,
    },

    /// 現在の包含状態ではスクリプトを生成できない
    #[error("Script generation error: {message}")]
    Generation {
        /// エラーメッセージ
        message: String,
    },

    /// 未登録の操作ID
    #[error("Operation not found: {operation_id}")]
    OperationNotFound {
        /// 操作ID
        operation_id: String,
    },

    /// 操作の情報を付けたエラー
    #[error("{context}: {source}")]
    Context {
        /// 付加情報（操作ID、エンドポイントなど）
        context: String,
        /// 元のエラー
        #[source]
        source: Box<CompareError>,
    },
}

impl CompareError {
    /// 設定エラーを作成
    pub fn configuration(message: impl Into<String>) -> Self {
        CompareError::Configuration {
            message: message.into(),
        }
    }

    /// I/Oエラーを作成
    pub fn io(path: impl Into<String>, cause: impl ToString) -> Self {
        CompareError::Io {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// プロバイダーエラーを作成
    pub fn provider(message: impl Into<String>) -> Self {
        CompareError::Provider {
            message: message.into(),
        }
    }

    /// スクリプト生成エラーを作成
    pub fn generation(message: impl Into<String>) -> Self {
        CompareError::Generation {
            message: message.into(),
        }
    }

    /// 付加情報でラップする
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CompareError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// ラップを剥がした根本のエラーを取得
    pub fn root(&self) -> &CompareError {
        match self {
            CompareError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// 設定エラーかどうか
    pub fn is_configuration(&self) -> bool {
        matches!(self.root(), CompareError::Configuration { .. })
    }

    /// I/Oエラーかどうか
    pub fn is_io(&self) -> bool {
        matches!(self.root(), CompareError::Io { .. })
    }

    /// プロバイダーエラーかどうか
    pub fn is_provider(&self) -> bool {
        matches!(self.root(), CompareError::Provider { .. })
    }

    /// エントリ未検出エラーかどうか
    pub fn is_entry_not_found(&self) -> bool {
        matches!(self.root(), CompareError::EntryNotFound { .. })
    }

    /// スクリプト生成エラーかどうか
    pub fn is_generation(&self) -> bool {
        matches!(self.root(), CompareError::Generation { .. })
    }

    /// 操作未検出エラーかどうか
    pub fn is_operation_not_found(&self) -> bool {
        matches!(self.root(), CompareError::OperationNotFound { .. })
    }
}

/// 長時間操作の内部エラー
///
/// 操作の途中でキャンセルを検知した場合と、通常の失敗を区別します。
/// 呼び出し元には OperationOutcome として報告されます。
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    #[error("Operation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] CompareError),
}

impl OperationError {
    /// キャンセルかどうか
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(CompareError::configuration("no connection").is_configuration());
        assert!(CompareError::io("/tmp/a.dacpac", "not found").is_io());
        assert!(CompareError::provider("boom").is_provider());
        assert!(CompareError::generation("cycle").is_generation());
        assert!(CompareError::EntryNotFound {
            entry: "Table table1 (Add)".to_string()
        }
        .is_entry_not_found());
    }

    #[test]
    fn test_context_keeps_root_kind() {
        let err = CompareError::provider("apply failed")
            .with_context("operation op-1 (db:local/src -> db:local/dst)");

        assert!(err.is_provider());
        assert!(!err.is_configuration());

        let message = err.to_string();
        assert!(message.contains("op-1"));
        assert!(message.contains("apply failed"));
    }

    #[test]
    fn test_io_error_message_contains_path() {
        let err = CompareError::io("/path/to/pkg.dacpac", "No such file");
        assert!(err.to_string().contains("/path/to/pkg.dacpac"));
    }

    #[test]
    fn test_operation_error_from_compare_error() {
        let err: OperationError = CompareError::provider("x").into();
        assert!(!err.is_cancelled());
        assert!(OperationError::Cancelled.is_cancelled());
    }
}
