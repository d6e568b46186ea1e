// importコマンドハンドラー
//
// Fullパッケージから新しいデータベースを作成し、行データを投入します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::operation::TaskExecutionMode;
use crate::services::package_operations::{DatabaseTarget, DeploymentSummary, ImportOperation};
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// import/deployコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutput {
    pub package: String,
    #[serde(flatten)]
    pub summary: DeploymentSummary,
}

impl CommandOutput for DeploymentOutput {
    fn to_text(&self) -> String {
        if !self.summary.applied {
            return self.summary.script.clone();
        }

        let mut message = format!(
            "{} {} -> {}: {} object(s)",
            "Deployed".green().bold(),
            self.package,
            self.summary.database_name,
            self.summary.object_count
        );
        if self.summary.row_count > 0 {
            message.push_str(&format!(", {} row(s)", self.summary.row_count));
        }
        message
    }
}

/// importコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ImportCommand {
    pub project_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub connection: String,
    pub database: String,
    pub package: PathBuf,
    pub dry_run: bool,
    pub format: OutputFormat,
}

/// importコマンドハンドラー
#[derive(Debug, Default)]
pub struct ImportCommandHandler {}

impl ImportCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// importコマンドを実行
    pub async fn execute(&self, command: &ImportCommand) -> Result<String> {
        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let operation = ImportOperation::new(
            context.compare_service(),
            command.package.clone(),
            DatabaseTarget::new(command.connection.clone(), command.database.clone()),
        );
        let mode = if command.dry_run {
            TaskExecutionMode::Script
        } else {
            TaskExecutionMode::Execute
        };

        let summary = context.run_operation(&operation, mode).await?;
        let output = DeploymentOutput {
            package: command.package.display().to_string(),
            summary,
        };
        render_output(&output, &command.format)
    }
}
