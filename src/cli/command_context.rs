// コマンド共通コンテキスト
//
// 設定ファイル読み込み、エンジンの組み立て、キャンセルの受付をCLI層で集約する。

use crate::adapters::database::ConfigConnectionProvider;
use crate::adapters::package_store::FilePackageStore;
use crate::core::config::Config;
use crate::core::endpoint::EndpointDescriptor;
use crate::core::operation::{CancellationToken, OperationOutcome, TaskExecutionMode};
use crate::services::operation_registry::OperationRegistry;
use crate::services::operation_runner::{LongRunningOperation, Operation};
use crate::services::schema_compare::SchemaCompareService;
use crate::services::schema_compare_api::SchemaCompareApi;
use crate::services::schema_compare_provider::TableSchemaProvider;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_path: Option<PathBuf>,
    pub config: Config,
    /// 操作IDの採番元
    pub registry: Arc<OperationRegistry>,
}

impl CommandContext {
    /// 設定ファイルを読み込んでコンテキストを作成
    ///
    /// 明示されたファイルが存在しない場合はエラー。
    /// 既定のファイルが存在しない場合は接続なしの設定で続行します（パッケージ同士の比較用）。
    pub fn load(project_path: PathBuf, custom_config_path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = custom_config_path {
            if !path.exists() {
                return Err(anyhow!("Config file not found: {:?}", path));
            }
            let config = Config::from_file(&path).with_context(|| "Failed to read config file")?;
            return Ok(Self::new(Some(path), config));
        }

        let default_path = project_path.join(Config::DEFAULT_CONFIG_PATH);
        if !default_path.exists() {
            debug!(path = ?default_path, "No config file, continuing without connections");
            let config = Config {
                version: "1.0".to_string(),
                connections: HashMap::new(),
            };
            return Ok(Self::new(None, config));
        }

        let config =
            Config::from_file(&default_path).with_context(|| "Failed to read config file")?;
        Ok(Self::new(Some(default_path), config))
    }

    fn new(config_path: Option<PathBuf>, config: Config) -> Self {
        Self {
            config_path,
            config,
            registry: Arc::new(OperationRegistry::new()),
        }
    }

    /// 設定の接続定義を使う比較エンジンを組み立てる
    pub fn compare_service(&self) -> SchemaCompareService {
        SchemaCompareService::new(
            Arc::new(TableSchemaProvider::new()),
            Arc::new(ConfigConnectionProvider::new(self.config.clone())),
            Arc::new(FilePackageStore::new()),
        )
    }

    /// コンテキストのレジストリを使うAPIを組み立てる
    pub fn api(&self) -> SchemaCompareApi {
        SchemaCompareApi::from_engine(self.registry.clone(), self.compare_service())
    }

    /// Ctrl-Cでキャンセルされるトークンを作成
    pub fn cancellation_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let handle = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested");
                handle.cancel();
            }
        });
        token
    }

    /// 操作IDを採番して操作を実行
    ///
    /// 実行中のCtrl-Cは `Operation::cancel` に渡され、操作は次の確認点で停止します。
    ///
    /// # Arguments
    ///
    /// * `operation` - 実行する操作
    /// * `mode` - 実行モード
    pub async fn run_operation<O>(&self, operation: &O, mode: TaskExecutionMode) -> Result<O::Output>
    where
        O: LongRunningOperation + ?Sized,
        O::Output: Clone + Sync + 'static,
    {
        let handle = Arc::new(Operation::new(self.registry.next_id(), mode));
        let watcher = {
            let handle = handle.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!(operation_id = %handle.id(), "Cancellation requested");
                    handle.cancel();
                }
            })
        };

        debug!(operation_id = %handle.id(), operation = %operation.name(), "Running operation");
        let outcome = handle.run(operation).await.clone();
        watcher.abort();
        into_result(outcome)
    }
}

/// エンドポイント文字列を解析
pub fn parse_endpoint(value: &str) -> Result<EndpointDescriptor> {
    value
        .parse::<EndpointDescriptor>()
        .with_context(|| format!("Invalid endpoint: {}", value))
}

/// 操作の結果をアプリケーションレベルのResultに変換
pub fn into_result<T>(outcome: OperationOutcome<T>) -> Result<T> {
    match outcome {
        OperationOutcome::Succeeded(value) => Ok(value),
        OperationOutcome::Failed(err) => Err(err.into()),
        OperationOutcome::Cancelled => Err(anyhow!("Operation cancelled")),
    }
}
