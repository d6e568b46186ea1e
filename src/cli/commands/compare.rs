// compareコマンドハンドラー
//
// 2つのエンドポイントを比較し、差分の一覧を表示します。

use crate::cli::command_context::{into_result, parse_endpoint, CommandContext};
use crate::cli::commands::{format_entries, render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::operation::OperationId;
use crate::core::schema_diff::DiffEntry;
use crate::services::schema_compare_api::{CompareRequest, CompareResponse};
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// compareコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct CompareOutput {
    pub operation_id: OperationId,
    pub source: String,
    pub target: String,
    pub is_valid: bool,
    pub is_equal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub differences: Vec<DiffEntry>,
}

impl CompareOutput {
    fn from_response(source: String, target: String, response: CompareResponse) -> Self {
        Self {
            operation_id: response.operation_id,
            source,
            target,
            is_valid: response.is_valid,
            is_equal: response.is_equal,
            error_message: response.error_message,
            differences: response.differences,
        }
    }
}

impl CommandOutput for CompareOutput {
    fn to_text(&self) -> String {
        let mut lines = vec![format!("Comparing {} -> {}", self.source, self.target)];

        if !self.is_valid {
            lines.push(format!(
                "{} {}",
                "Comparison failed:".red().bold(),
                self.error_message.as_deref().unwrap_or("unknown error")
            ));
            return lines.join("\n");
        }

        if self.is_equal {
            lines.push(format!("{}", "Schemas are identical.".green()));
            return lines.join("\n");
        }

        lines.push(format!("{} difference(s):", self.differences.len()));
        lines.extend(format_entries(&self.differences));
        lines.join("\n")
    }
}

/// compareコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct CompareCommand {
    pub project_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub source: String,
    pub target: String,
    pub format: OutputFormat,
}

/// compareコマンドハンドラー
#[derive(Debug, Default)]
pub struct CompareCommandHandler {}

impl CompareCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// compareコマンドを実行
    ///
    /// 比較が無効（パッケージが読めない、データベースに到達できない）でもエラーにはせず、
    /// 結果として表示します。
    pub async fn execute(&self, command: &CompareCommand) -> Result<String> {
        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let source = parse_endpoint(&command.source)?;
        let target = parse_endpoint(&command.target)?;

        let api = context.api();
        let token = context.cancellation_token();
        let response = into_result(
            api.compare(
                CompareRequest {
                    operation_id: None,
                    source: source.clone(),
                    target: target.clone(),
                },
                &token,
            )
            .await,
        )?;

        let output =
            CompareOutput::from_response(source.to_string(), target.to_string(), response);
        render_output(&output, &command.format)
    }
}
