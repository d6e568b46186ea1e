// 比較エンジン
//
// 2つのエンドポイントからスキーマモデルを解決し、プロバイダーに差分計算を委譲します。
// エンジン自体は状態を持たず、結果のレジストリ登録は呼び出し側の責務です。

use crate::adapters::database::ConnectionProvider;
use crate::adapters::package_store::PackageStore;
use crate::core::endpoint::EndpointDescriptor;
use crate::core::error::{CompareError, OperationError};
use crate::core::operation::CancellationToken;
use crate::core::schema::Schema;
use crate::core::schema_diff::ComparisonResult;
use crate::services::schema_compare_provider::SchemaCompareProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// 比較エンジン
#[derive(Clone)]
pub struct SchemaCompareService {
    provider: Arc<dyn SchemaCompareProvider>,
    connections: Arc<dyn ConnectionProvider>,
    packages: Arc<dyn PackageStore>,
}

impl SchemaCompareService {
    /// 新しいSchemaCompareServiceを作成
    ///
    /// # Arguments
    ///
    /// * `provider` - 差分計算を行うプロバイダー
    /// * `connections` - データベースエンドポイントの解決
    /// * `packages` - パッケージエンドポイントの解決
    pub fn new(
        provider: Arc<dyn SchemaCompareProvider>,
        connections: Arc<dyn ConnectionProvider>,
        packages: Arc<dyn PackageStore>,
    ) -> Self {
        Self {
            provider,
            connections,
            packages,
        }
    }

    pub fn provider(&self) -> &Arc<dyn SchemaCompareProvider> {
        &self.provider
    }

    pub fn connections(&self) -> &Arc<dyn ConnectionProvider> {
        &self.connections
    }

    pub fn packages(&self) -> &Arc<dyn PackageStore> {
        &self.packages
    }

    /// ソースとターゲットを比較
    ///
    /// エンドポイントの記述が不足している場合や、接続名が設定に無い場合は設定エラー。
    /// モデルを解決できなかった場合（読めないパッケージ、到達できないデータベース）は
    /// エラーではなく `is_valid = false` の結果を返します。差分計算自体の失敗はプロバイダーエラーです。
    ///
    /// # Arguments
    ///
    /// * `source` - あるべき姿のエンドポイント
    /// * `target` - 現在のエンドポイント
    /// * `token` - キャンセルトークン（プロバイダー呼び出しの前に確認）
    pub async fn compare(
        &self,
        source: &EndpointDescriptor,
        target: &EndpointDescriptor,
        token: &CancellationToken,
    ) -> Result<ComparisonResult, OperationError> {
        token.check()?;
        self.resolve(source)?;
        self.resolve(target)?;

        info!(source = %source, target = %target, "Starting schema comparison");

        token.check()?;
        let source_model = match self.load_model(source).await {
            Ok(model) => model,
            Err(err) => return Ok(self.invalid_result(source, target, "source", err)),
        };

        token.check()?;
        let target_model = match self.load_model(target).await {
            Ok(model) => model,
            Err(err) => return Ok(self.invalid_result(source, target, "target", err)),
        };

        token.check()?;
        let differences = self
            .provider
            .diff(&source_model, &target_model)
            .map_err(|e| e.with_context(format!("comparing {} -> {}", source, target)))?;

        let target_dialect = target_model.dialect.or(source_model.dialect);
        let result =
            ComparisonResult::new(source.clone(), target.clone(), target_dialect, differences);

        info!(
            source = %source,
            target = %target,
            differences = result.len(),
            is_equal = result.is_equal(),
            "Schema comparison finished"
        );
        Ok(result)
    }

    /// エンドポイントの記述と接続名を検証（接続はしない）
    fn resolve(&self, endpoint: &EndpointDescriptor) -> Result<(), CompareError> {
        endpoint.validate()?;
        if let EndpointDescriptor::Database {
            connection: Some(connection),
            ..
        } = endpoint
        {
            self.connections.dialect(connection)?;
        }
        Ok(())
    }

    /// エンドポイントからスキーマモデルを読み込む
    pub async fn load_model(&self, endpoint: &EndpointDescriptor) -> Result<Schema, CompareError> {
        match endpoint {
            EndpointDescriptor::Package { path } => {
                let package = self.packages.read(path)?;
                Ok(package.schema)
            }
            EndpointDescriptor::Database {
                connection,
                database_name,
            } => {
                let connection = connection.as_deref().ok_or_else(|| {
                    CompareError::configuration(format!(
                        "No connection supplied for database endpoint '{}'",
                        database_name
                    ))
                })?;
                let database = self.connections.connect(connection, database_name).await?;
                let model = self.provider.read_model(&database).await;
                database.close().await;
                model
            }
        }
    }

    fn invalid_result(
        &self,
        source: &EndpointDescriptor,
        target: &EndpointDescriptor,
        side: &str,
        err: CompareError,
    ) -> ComparisonResult {
        warn!(source = %source, target = %target, error = %err, "Could not load {} model", side);
        ComparisonResult::invalid(
            source.clone(),
            target.clone(),
            format!("Failed to load {} model: {}", side, err),
        )
    }
}
