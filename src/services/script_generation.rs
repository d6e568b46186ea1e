// スクリプト生成エンジン
//
// 比較結果のうち包含されている差分だけを配置スクリプトに変換します。
// 比較結果（差分リストと包含フラグ）は変更しません。

use crate::core::error::CompareError;
use crate::core::schema_diff::ComparisonResult;
use crate::services::schema_compare_provider::{
    DeploymentSelection, DeploymentStep, SchemaCompareProvider,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// スクリプト生成結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptGenerationResult {
    pub success: bool,
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptGenerationResult {
    /// 成功結果を作成
    pub fn succeeded(script: String) -> Self {
        Self {
            success: true,
            script,
            error: None,
        }
    }

    /// 失敗結果を作成
    pub fn failed(error: &CompareError) -> Self {
        Self {
            success: false,
            script: String::new(),
            error: Some(error.to_string()),
        }
    }

    /// スクリプト中のSQL文の数（コメント行を除く）
    pub fn statement_count(&self) -> usize {
        self.script.matches(';').count()
    }
}

/// スクリプト生成エンジン
#[derive(Clone)]
pub struct ScriptGenerationService {
    provider: Arc<dyn SchemaCompareProvider>,
}

impl ScriptGenerationService {
    pub fn new(provider: Arc<dyn SchemaCompareProvider>) -> Self {
        Self { provider }
    }

    /// 包含されている差分の適用手順を生成
    ///
    /// # Returns
    ///
    /// 適用順の手順。無効な比較結果や方言不明、依存関係を満たせない場合は GenerationError
    pub fn render_steps(
        &self,
        result: &ComparisonResult,
    ) -> Result<Vec<DeploymentStep>, CompareError> {
        if !result.is_valid() {
            return Err(CompareError::generation(format!(
                "Cannot generate a script from an invalid comparison: {}",
                result.error_message().unwrap_or("unknown error")
            )));
        }

        let dialect = result.target_dialect().ok_or_else(|| {
            CompareError::generation("Target database dialect is unknown")
        })?;

        self.provider
            .render(&DeploymentSelection::from_result(result), dialect)
    }

    /// 配置スクリプトを生成
    ///
    /// # Arguments
    ///
    /// * `result` - 比較結果
    /// * `target_name` - スクリプトの見出しに使うターゲット名
    pub fn render_script(
        &self,
        result: &ComparisonResult,
        target_name: &str,
    ) -> Result<String, CompareError> {
        let steps = self.render_steps(result)?;
        let script = format_script(result, target_name, &steps);
        debug!(
            target = %target_name,
            steps = steps.len(),
            length = script.len(),
            "Deployment script generated"
        );
        Ok(script)
    }

    /// 配置スクリプトを生成し、失敗を結果として返す
    pub fn generate_script(
        &self,
        result: &ComparisonResult,
        target_name: &str,
    ) -> ScriptGenerationResult {
        match self.render_script(result, target_name) {
            Ok(script) => ScriptGenerationResult::succeeded(script),
            Err(err) => {
                warn!(target = %target_name, error = %err, "Script generation failed");
                ScriptGenerationResult::failed(&err)
            }
        }
    }
}

/// 手順をスクリプト文字列に整形
pub fn format_script(result: &ComparisonResult, target_name: &str, steps: &[DeploymentStep]) -> String {
    let mut lines = vec![
        format!("-- Deployment script for target: {}", target_name),
        format!("-- Source: {}", result.source()),
        format!("-- Target: {}", result.target()),
    ];

    for step in steps {
        lines.push(String::new());
        lines.push(step.heading());
        lines.extend(step.statements.iter().cloned());
    }

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Dialect;
    use crate::core::endpoint::EndpointDescriptor;
    use crate::core::schema::{Column, Table};
    use crate::core::schema_diff::Difference;
    use crate::services::schema_compare_provider::TableSchemaProvider;

    fn table(name: &str) -> Table {
        let mut table = Table::new(name);
        table.add_column(Column::new("col1", "INT", true));
        table
    }

    fn sample_result() -> ComparisonResult {
        ComparisonResult::new(
            EndpointDescriptor::database("local", "source.db"),
            EndpointDescriptor::database("local", "target.db"),
            Some(Dialect::SQLite),
            vec![
                Difference::table_added(&table("table1")),
                Difference::table_added(&table("table2")),
            ],
        )
    }

    fn service() -> ScriptGenerationService {
        ScriptGenerationService::new(Arc::new(TableSchemaProvider::new()))
    }

    #[test]
    fn test_script_contains_header_and_included_tables() {
        let generated = service().generate_script(&sample_result(), "target.db");

        assert!(generated.success);
        assert!(generated
            .script
            .starts_with("-- Deployment script for target: target.db"));
        assert!(generated.script.contains(r#"CREATE TABLE "table1""#));
        assert!(generated.script.contains(r#"CREATE TABLE "table2""#));
        assert_eq!(generated.statement_count(), 2);
    }

    #[test]
    fn test_excluding_never_lengthens_script() {
        let mut result = sample_result();
        let before = service().generate_script(&result, "target.db");

        result.set_included(1, false);
        let after = service().generate_script(&result, "target.db");
        assert!(before.script.len() >= after.script.len());
        assert!(!after.script.contains("table2"));

        result.set_included(1, true);
        let restored = service().generate_script(&result, "target.db");
        assert_eq!(restored, before);
    }

    #[test]
    fn test_generation_does_not_mutate_result() {
        let result = sample_result();
        let before = result.clone();
        service().generate_script(&result, "target.db");
        assert_eq!(result, before);
    }

    #[test]
    fn test_invalid_result_fails_generation() {
        let result = ComparisonResult::invalid(
            EndpointDescriptor::package("missing.dacpac"),
            EndpointDescriptor::database("local", "target.db"),
            "not found",
        );
        let err = service().render_script(&result, "target.db").unwrap_err();
        assert!(err.is_generation());

        let generated = service().generate_script(&result, "target.db");
        assert!(!generated.success);
        assert!(generated.error.unwrap().contains("not found"));
    }
}
