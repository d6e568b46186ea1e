// publishコマンドハンドラー
//
// 除外されていない差分をターゲットデータベースに適用し、オブジェクトごとの結果を表示します。

use crate::cli::command_context::{into_result, parse_endpoint, CommandContext};
use crate::cli::commands::{compare_with_exclusions, render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::operation::TaskExecutionMode;
use crate::services::publish::{ObjectError, PublishResult};
use crate::services::schema_compare_api::PublishRequest;
use anyhow::{anyhow, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// publishコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutput {
    pub target: String,
    pub dry_run: bool,
    pub success: bool,
    pub applied: Vec<String>,
    pub errors: Vec<ObjectError>,
    pub script: String,
}

impl PublishOutput {
    fn new(target: String, dry_run: bool, result: PublishResult) -> Self {
        Self {
            target,
            dry_run,
            success: result.success,
            applied: result.applied,
            errors: result.errors,
            script: result.script,
        }
    }
}

impl CommandOutput for PublishOutput {
    fn to_text(&self) -> String {
        if self.dry_run {
            return format!("-- Dry run: nothing was applied\n{}", self.script);
        }

        let mut lines = Vec::new();
        for object in &self.applied {
            lines.push(format!("{} {}", "✓".green(), object));
        }
        for error in &self.errors {
            lines.push(format!(
                "{} {} ({}): {}",
                "✗".red(),
                error.object,
                error.change_kind,
                error.message
            ));
        }

        if self.success {
            lines.push(format!(
                "{} {} object(s) published to {}",
                "Publish complete:".green().bold(),
                self.applied.len(),
                self.target
            ));
        } else {
            lines.push(format!(
                "{} {} applied, {} failed",
                "Publish finished with errors:".red().bold(),
                self.applied.len(),
                self.errors.len()
            ));
        }
        lines.join("\n")
    }
}

/// publishコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct PublishCommand {
    pub project_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub source: String,
    pub target: String,
    pub exclude: Vec<String>,
    pub dry_run: bool,
    pub format: OutputFormat,
}

/// publishコマンドハンドラー
#[derive(Debug, Default)]
pub struct PublishCommandHandler {}

impl PublishCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// publishコマンドを実行
    ///
    /// 一部のオブジェクトが失敗した場合も結果を表示した上でエラーを返します。
    pub async fn execute(&self, command: &PublishCommand) -> Result<String> {
        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let source = parse_endpoint(&command.source)?;
        let target = parse_endpoint(&command.target)?;
        let target_name = target.display_name();

        let api = context.api();
        let token = context.cancellation_token();
        let response =
            compare_with_exclusions(&api, source, target, &command.exclude, &token).await?;

        let mode = if command.dry_run {
            TaskExecutionMode::Script
        } else {
            TaskExecutionMode::Execute
        };
        let result = into_result(
            api.publish(
                PublishRequest {
                    operation_id: response.operation_id,
                    target_name: target_name.clone(),
                },
                mode,
                &token,
            )
            .await,
        )?;

        let output = PublishOutput::new(target_name, command.dry_run, result);
        let rendered = render_output(&output, &command.format)?;
        if output.success {
            Ok(rendered)
        } else {
            Err(anyhow!("{}", rendered))
        }
    }
}
