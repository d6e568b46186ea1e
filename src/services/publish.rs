// 発行エンジン
//
// 包含されている差分をターゲットデータベースに適用し、オブジェクトごとの成否を報告します。
// 1つのオブジェクトの失敗で残りを中断せず、全体の原子性は保証しません。

use crate::adapters::database::{ConnectionProvider, DatabaseHandle};
use crate::core::endpoint::EndpointDescriptor;
use crate::core::error::{CompareError, OperationError};
use crate::core::operation::{CancellationToken, TaskExecutionMode};
use crate::core::schema_diff::{ChangeKind, ComparisonResult};
use crate::services::schema_compare_provider::SchemaCompareProvider;
use crate::services::script_generation::{format_script, ScriptGenerationService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// オブジェクト単位の適用エラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectError {
    /// オブジェクトの修飾名
    pub object: String,
    pub change_kind: ChangeKind,
    pub message: String,
}

/// 発行結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    /// すべてのオブジェクトの適用に成功したか
    pub success: bool,
    /// 適用に失敗したオブジェクト
    pub errors: Vec<ObjectError>,
    /// 適用に成功したオブジェクト
    #[serde(default)]
    pub applied: Vec<String>,
    /// 適用した（Scriptモードでは適用するはずの）スクリプト
    pub script: String,
}

/// 発行エンジン
#[derive(Clone)]
pub struct PublishService {
    provider: Arc<dyn SchemaCompareProvider>,
    connections: Arc<dyn ConnectionProvider>,
    script_generator: ScriptGenerationService,
}

impl PublishService {
    pub fn new(
        provider: Arc<dyn SchemaCompareProvider>,
        connections: Arc<dyn ConnectionProvider>,
    ) -> Self {
        Self {
            script_generator: ScriptGenerationService::new(provider.clone()),
            provider,
            connections,
        }
    }

    /// 包含されている差分を発行
    ///
    /// Scriptモードではスクリプトを生成するだけでターゲットは変更しません。
    /// Executeモードではオブジェクトごとに適用し、各適用の前にキャンセルを確認します。
    ///
    /// # Arguments
    ///
    /// * `result` - 比較結果（読み取りのみ）
    /// * `target_name` - スクリプトの見出しに使うターゲット名
    /// * `mode` - 実行モード
    /// * `token` - キャンセルトークン
    pub async fn publish(
        &self,
        result: &ComparisonResult,
        target_name: &str,
        mode: TaskExecutionMode,
        token: &CancellationToken,
    ) -> Result<PublishResult, OperationError> {
        token.check()?;
        let steps = self.script_generator.render_steps(result)?;
        let script = format_script(result, target_name, &steps);

        if mode.is_script() {
            return Ok(PublishResult {
                success: true,
                errors: Vec::new(),
                applied: Vec::new(),
                script,
            });
        }

        token.check()?;
        let database = self.connect_target(result.target()).await?;

        let mut errors = Vec::new();
        let mut applied = Vec::new();
        for step in &steps {
            if token.is_cancelled() {
                warn!(target = %target_name, applied = applied.len(), "Publish cancelled");
                database.close().await;
                return Err(OperationError::Cancelled);
            }

            match self.provider.apply(step, &database).await {
                Ok(()) => {
                    info!(object = %step.object, change = %step.change_kind, "Applied");
                    applied.push(step.object.name.clone());
                }
                Err(err) => {
                    warn!(object = %step.object, change = %step.change_kind, error = %err, "Apply failed");
                    errors.push(ObjectError {
                        object: step.object.name.clone(),
                        change_kind: step.change_kind,
                        message: err.to_string(),
                    });
                }
            }
        }
        database.close().await;

        info!(
            target = %target_name,
            applied = applied.len(),
            failed = errors.len(),
            "Publish finished"
        );
        Ok(PublishResult {
            success: errors.is_empty(),
            errors,
            applied,
            script,
        })
    }

    async fn connect_target(
        &self,
        target: &EndpointDescriptor,
    ) -> Result<DatabaseHandle, CompareError> {
        match target {
            EndpointDescriptor::Database {
                connection: Some(connection),
                database_name,
            } => self.connections.connect(connection, database_name).await,
            EndpointDescriptor::Database { database_name, .. } => {
                Err(CompareError::configuration(format!(
                    "No connection supplied for database endpoint '{}'",
                    database_name
                )))
            }
            EndpointDescriptor::Package { path } => Err(CompareError::configuration(format!(
                "Cannot publish to a package target: {}",
                path.display()
            ))),
        }
    }
}
