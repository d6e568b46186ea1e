// deploy / deploy-reportコマンドハンドラー
//
// パッケージのスキーマをデータベースに配置します。
// deploy-reportは配置で行われるアクションを報告するだけで、データベースは変更しません。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::import::DeploymentOutput;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::operation::TaskExecutionMode;
use crate::services::package_operations::{
    DatabaseTarget, DeployActionKind, DeployOperation, DeployPlan, GenerateDeployPlanOperation,
};
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// deployコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct DeployCommand {
    pub project_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub connection: String,
    pub database: String,
    pub package: PathBuf,
    pub upgrade_existing: bool,
    pub dry_run: bool,
    pub format: OutputFormat,
}

/// deployコマンドハンドラー
#[derive(Debug, Default)]
pub struct DeployCommandHandler {}

impl DeployCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// deployコマンドを実行
    pub async fn execute(&self, command: &DeployCommand) -> Result<String> {
        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let operation = DeployOperation::new(
            context.compare_service(),
            command.package.clone(),
            DatabaseTarget::new(command.connection.clone(), command.database.clone()),
            command.upgrade_existing,
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

/// deploy-reportコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct DeployReportOutput {
    #[serde(flatten)]
    pub plan: DeployPlan,
}

impl CommandOutput for DeployReportOutput {
    fn to_text(&self) -> String {
        let mut lines = vec![format!(
            "Deployment of {} to {}",
            self.plan.source, self.plan.target
        )];

        if self.plan.is_empty() {
            lines.push(format!("{}", "No changes.".green()));
            return lines.join("\n");
        }

        for action in &self.plan.actions {
            let verb = match action.action {
                DeployActionKind::Create => action.action.to_string().green(),
                DeployActionKind::Drop => action.action.to_string().red(),
                DeployActionKind::Alter => action.action.to_string().yellow(),
            };
            lines.push(format!("  {} {}", verb, action.object));
            for detail in &action.details {
                lines.push(format!("      {}", detail));
            }
        }

        lines.push(format!(
            "{} to create, {} to alter, {} to drop",
            self.plan.count(DeployActionKind::Create),
            self.plan.count(DeployActionKind::Alter),
            self.plan.count(DeployActionKind::Drop)
        ));
        lines.join("\n")
    }
}

/// deploy-reportコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct DeployReportCommand {
    pub project_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub connection: String,
    pub database: String,
    pub package: PathBuf,
    pub format: OutputFormat,
}

/// deploy-reportコマンドハンドラー
#[derive(Debug, Default)]
pub struct DeployReportCommandHandler {}

impl DeployReportCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// deploy-reportコマンドを実行
    pub async fn execute(&self, command: &DeployReportCommand) -> Result<String> {
        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let operation = GenerateDeployPlanOperation::new(
            context.compare_service(),
            command.package.clone(),
            DatabaseTarget::new(command.connection.clone(), command.database.clone()),
        );

        let plan = context
            .run_operation(&operation, TaskExecutionMode::Script)
            .await?;
        render_output(&DeployReportOutput { plan }, &command.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::package_operations::DeployAction;

    #[test]
    fn test_report_text_lists_actions() {
        colored::control::set_override(false);
        let output = DeployReportOutput {
            plan: DeployPlan {
                source: "package:app.dacpac".to_string(),
                target: "db:local/app.db".to_string(),
                actions: vec![
                    DeployAction {
                        action: DeployActionKind::Create,
                        object: "table1".to_string(),
                        details: Vec::new(),
                    },
                    DeployAction {
                        action: DeployActionKind::Drop,
                        object: "table3".to_string(),
                        details: Vec::new(),
                    },
                ],
            },
        };

        let text = output.to_text();
        assert!(text.contains("  Create table1"));
        assert!(text.contains("  Drop table3"));
        assert!(text.contains("1 to create, 0 to alter, 1 to drop"));
    }
}
