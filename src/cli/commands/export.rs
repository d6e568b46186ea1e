// export / extractコマンドハンドラー
//
// データベースのスキーマ（exportは行データも）をパッケージファイルに書き出します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::operation::TaskExecutionMode;
use crate::core::package::PackageKind;
use crate::services::package_operations::{
    DatabaseTarget, ExportOperation, ExtractOperation, PackageSummary,
};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

/// export/extractコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutput {
    pub database: String,
    #[serde(flatten)]
    pub summary: PackageSummary,
}

impl CommandOutput for ExportOutput {
    fn to_text(&self) -> String {
        let kind = match self.summary.kind {
            PackageKind::Schema => "schema package",
            PackageKind::Full => "full package",
        };
        let mut message = format!(
            "{} table(s), {} row(s) read from {}",
            self.summary.table_count, self.summary.row_count, self.database
        );
        if self.summary.written {
            message.push_str(&format!(
                "\nWrote {} to {}",
                kind,
                self.summary.path.display()
            ));
        } else {
            message.push_str(&format!(
                "\nDry run: {} not written to {}",
                kind,
                self.summary.path.display()
            ));
        }
        message
    }
}

/// export/extractコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ExportCommand {
    pub project_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub connection: String,
    pub database: String,
    pub output: PathBuf,
    /// 行データを含めるか（exportはtrue、extractはfalse）
    pub include_data: bool,
    pub application_name: Option<String>,
    pub application_version: Option<String>,
    pub dry_run: bool,
    pub format: OutputFormat,
}

/// export/extractコマンドハンドラー
#[derive(Debug, Default)]
pub struct ExportCommandHandler {}

impl ExportCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// export/extractコマンドを実行
    pub async fn execute(&self, command: &ExportCommand) -> Result<String> {
        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let service = context.compare_service();
        let source = DatabaseTarget::new(command.connection.clone(), command.database.clone());
        let mode = if command.dry_run {
            TaskExecutionMode::Script
        } else {
            TaskExecutionMode::Execute
        };

        let summary = if command.include_data {
            let operation = ExportOperation::new(service, source.clone(), command.output.clone());
            context.run_operation(&operation, mode).await?
        } else {
            let operation = ExtractOperation::new(service, source.clone(), command.output.clone())
                .with_application(
                    command.application_name.clone(),
                    command.application_version.clone(),
                );
            context.run_operation(&operation, mode).await?
        };

        let output = ExportOutput {
            database: source.to_string(),
            summary,
        };
        render_output(&output, &command.format)
    }
}
