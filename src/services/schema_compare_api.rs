// スキーマ比較API
//
// 呼び出し側に公開するリクエスト/レスポンスの表面。
// 比較結果は操作IDでレジストリに登録され、包含切り替え・スクリプト生成・発行は
// 同じ操作IDの比較結果に対して行われます。

use crate::core::endpoint::EndpointDescriptor;
use crate::core::error::{CompareError, OperationError};
use crate::core::operation::{CancellationToken, OperationId, OperationOutcome, TaskExecutionMode};
use crate::core::schema_diff::{ComparisonResult, DiffEntry};
use crate::services::include_exclude::set_inclusion_for_operation;
use crate::services::operation_registry::OperationRegistry;
use crate::services::operation_runner::{LongRunningOperation, Operation};
use crate::services::publish::{PublishResult, PublishService};
use crate::services::schema_compare::SchemaCompareService;
use crate::services::script_generation::{ScriptGenerationResult, ScriptGenerationService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// 比較リクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    /// 既存の操作ID（指定時はその比較結果を置き換える）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<OperationId>,
    pub source: EndpointDescriptor,
    pub target: EndpointDescriptor,
}

/// 比較レスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareResponse {
    pub operation_id: OperationId,
    pub is_valid: bool,
    pub is_equal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub differences: Vec<DiffEntry>,
}

impl CompareResponse {
    pub fn from_result(operation_id: OperationId, result: &ComparisonResult) -> Self {
        Self {
            operation_id,
            is_valid: result.is_valid(),
            is_equal: result.is_equal(),
            error_message: result.error_message().map(str::to_string),
            differences: result.entries(),
        }
    }
}

/// 包含切り替えリクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub operation_id: OperationId,
    pub entry: DiffEntry,
    pub included: bool,
}

/// 包含切り替えの応答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub operation_id: OperationId,
    /// 切り替え後のエントリ（テーブル単位）
    pub entry: DiffEntry,
    /// 包含されている差分の数
    pub included_count: usize,
}

/// スクリプト生成リクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateScriptRequest {
    pub operation_id: OperationId,
    pub target_name: String,
}

/// 発行リクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub operation_id: OperationId,
    pub target_name: String,
}

/// スキーマ比較API
pub struct SchemaCompareApi {
    registry: Arc<OperationRegistry>,
    engine: SchemaCompareService,
    script_generator: ScriptGenerationService,
    publisher: PublishService,
}

impl SchemaCompareApi {
    pub fn new(
        registry: Arc<OperationRegistry>,
        engine: SchemaCompareService,
        script_generator: ScriptGenerationService,
        publisher: PublishService,
    ) -> Self {
        Self {
            registry,
            engine,
            script_generator,
            publisher,
        }
    }

    /// 比較エンジンと同じ協調者から各エンジンを組み立てる
    pub fn from_engine(registry: Arc<OperationRegistry>, engine: SchemaCompareService) -> Self {
        let script_generator = ScriptGenerationService::new(engine.provider().clone());
        let publisher =
            PublishService::new(engine.provider().clone(), engine.connections().clone());
        Self::new(registry, engine, script_generator, publisher)
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// 比較を実行し、結果を操作IDで登録する
    ///
    /// 既存の操作IDを指定した場合、その比較結果は新しい結果で置き換えられ、
    /// 包含フラグは引き継がれません。未登録の操作IDを指定した場合は
    /// `OperationNotFound` で失敗し、何も登録されません。
    pub async fn compare(
        &self,
        request: CompareRequest,
        token: &CancellationToken,
    ) -> OperationOutcome<CompareResponse> {
        let (operation_id, supersedes) = match request.operation_id {
            Some(operation_id) => {
                if let Err(err) = self.registry.get(&operation_id).await {
                    return OperationOutcome::Failed(err);
                }
                (operation_id, true)
            }
            None => (self.registry.next_id(), false),
        };

        let operation = CompareOperation {
            engine: &self.engine,
            source: &request.source,
            target: &request.target,
        };
        let handle = Operation::with_token(
            operation_id.clone(),
            TaskExecutionMode::Execute,
            token.clone(),
        );

        let result = match handle.complete(&operation).await {
            OperationOutcome::Succeeded(result) => result,
            OperationOutcome::Failed(err) => return OperationOutcome::Failed(err),
            OperationOutcome::Cancelled => return OperationOutcome::Cancelled,
        };

        if supersedes {
            // 比較中に削除された場合
            if let Err(err) = self.registry.replace(&operation_id, result.clone()).await {
                return OperationOutcome::Failed(err);
            }
        } else {
            self.registry.insert(operation_id.clone(), result.clone()).await;
        }

        info!(
            operation_id = %operation_id,
            differences = result.len(),
            "Comparison registered"
        );
        OperationOutcome::Succeeded(CompareResponse::from_result(operation_id, &result))
    }

    /// 差分エントリの包含フラグを設定
    pub async fn set_inclusion(&self, request: ToggleRequest) -> Result<ToggleResponse, CompareError> {
        let (entry, included_count) = set_inclusion_for_operation(
            &self.registry,
            &request.operation_id,
            &request.entry,
            request.included,
        )
        .await?;

        Ok(ToggleResponse {
            operation_id: request.operation_id,
            entry,
            included_count,
        })
    }

    /// 操作の比較結果から配置スクリプトを生成
    pub async fn generate_script(
        &self,
        request: GenerateScriptRequest,
        token: &CancellationToken,
    ) -> OperationOutcome<ScriptGenerationResult> {
        let operation = ScriptOperation {
            registry: &self.registry,
            generator: &self.script_generator,
            request: &request,
        };
        Operation::with_token(
            request.operation_id.clone(),
            TaskExecutionMode::Script,
            token.clone(),
        )
        .complete(&operation)
        .await
    }

    /// 操作の比較結果をターゲットに発行
    pub async fn publish(
        &self,
        request: PublishRequest,
        mode: TaskExecutionMode,
        token: &CancellationToken,
    ) -> OperationOutcome<PublishResult> {
        let operation = PublishOperation {
            registry: &self.registry,
            publisher: &self.publisher,
            request: &request,
        };
        Operation::with_token(request.operation_id.clone(), mode, token.clone())
            .complete(&operation)
            .await
    }

    /// 操作をレジストリから削除
    pub async fn remove(&self, operation_id: &OperationId) -> bool {
        self.registry.remove(operation_id).await
    }
}

struct CompareOperation<'a> {
    engine: &'a SchemaCompareService,
    source: &'a EndpointDescriptor,
    target: &'a EndpointDescriptor,
}

#[async_trait]
impl LongRunningOperation for CompareOperation<'_> {
    type Output = ComparisonResult;

    fn name(&self) -> String {
        format!("compare {} -> {}", self.source, self.target)
    }

    async fn execute(&self, token: &CancellationToken) -> Result<ComparisonResult, OperationError> {
        self.engine.compare(self.source, self.target, token).await
    }

    // 比較は読み取りのみ
    async fn script(&self, token: &CancellationToken) -> Result<ComparisonResult, OperationError> {
        self.execute(token).await
    }
}

struct ScriptOperation<'a> {
    registry: &'a OperationRegistry,
    generator: &'a ScriptGenerationService,
    request: &'a GenerateScriptRequest,
}

#[async_trait]
impl LongRunningOperation for ScriptOperation<'_> {
    type Output = ScriptGenerationResult;

    fn name(&self) -> String {
        format!("generate script for operation {}", self.request.operation_id)
    }

    async fn execute(
        &self,
        token: &CancellationToken,
    ) -> Result<ScriptGenerationResult, OperationError> {
        self.script(token).await
    }

    async fn script(
        &self,
        token: &CancellationToken,
    ) -> Result<ScriptGenerationResult, OperationError> {
        let result = self.registry.snapshot(&self.request.operation_id).await?;
        token.check()?;
        Ok(self
            .generator
            .generate_script(&result, &self.request.target_name))
    }
}

struct PublishOperation<'a> {
    registry: &'a OperationRegistry,
    publisher: &'a PublishService,
    request: &'a PublishRequest,
}

impl PublishOperation<'_> {
    async fn publish(
        &self,
        mode: TaskExecutionMode,
        token: &CancellationToken,
    ) -> Result<PublishResult, OperationError> {
        let result = self.registry.snapshot(&self.request.operation_id).await?;
        self.publisher
            .publish(&result, &self.request.target_name, mode, token)
            .await
    }
}

#[async_trait]
impl LongRunningOperation for PublishOperation<'_> {
    type Output = PublishResult;

    fn name(&self) -> String {
        format!("publish operation {}", self.request.operation_id)
    }

    async fn execute(&self, token: &CancellationToken) -> Result<PublishResult, OperationError> {
        self.publish(TaskExecutionMode::Execute, token).await
    }

    async fn script(&self, token: &CancellationToken) -> Result<PublishResult, OperationError> {
        self.publish(TaskExecutionMode::Script, token).await
    }
}
