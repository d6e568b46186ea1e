// scriptコマンドハンドラー
//
// 比較結果のうち除外されていない差分から配置スクリプトを生成します。

use crate::cli::command_context::{into_result, parse_endpoint, CommandContext};
use crate::cli::commands::{compare_with_exclusions, render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::services::schema_compare_api::GenerateScriptRequest;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// scriptコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct ScriptOutput {
    pub target: String,
    pub excluded: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub script: String,
    /// テキスト出力メッセージ
    #[serde(skip)]
    pub text_message: String,
}

impl CommandOutput for ScriptOutput {
    fn to_text(&self) -> String {
        self.text_message.clone()
    }
}

/// scriptコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ScriptCommand {
    pub project_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub source: String,
    pub target: String,
    pub exclude: Vec<String>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
}

/// scriptコマンドハンドラー
#[derive(Debug, Default)]
pub struct ScriptCommandHandler {}

impl ScriptCommandHandler {
    pub fn new() -> Self {
        Self {}
    }

    /// scriptコマンドを実行
    pub async fn execute(&self, command: &ScriptCommand) -> Result<String> {
        let context =
            CommandContext::load(command.project_path.clone(), command.config_path.clone())?;
        let source = parse_endpoint(&command.source)?;
        let target = parse_endpoint(&command.target)?;
        let target_name = target.display_name();

        let api = context.api();
        let token = context.cancellation_token();
        let response =
            compare_with_exclusions(&api, source, target, &command.exclude, &token).await?;

        let generated = into_result(
            api.generate_script(
                GenerateScriptRequest {
                    operation_id: response.operation_id,
                    target_name: target_name.clone(),
                },
                &token,
            )
            .await,
        )?;
        if !generated.success {
            return Err(anyhow!(
                "Failed to generate script: {}",
                generated.error.as_deref().unwrap_or("unknown error")
            ));
        }

        let (output_path, text_message) = match &command.output {
            Some(path) => {
                fs::write(path, &generated.script)
                    .with_context(|| format!("Failed to write script file: {:?}", path))?;
                (
                    Some(path.to_string_lossy().to_string()),
                    format!(
                        "Wrote {} statement(s) to {}",
                        generated.statement_count(),
                        path.display()
                    ),
                )
            }
            None => (None, generated.script.clone()),
        };

        let output = ScriptOutput {
            target: target_name,
            excluded: command.exclude.clone(),
            output_path,
            script: generated.script,
            text_message,
        };
        render_output(&output, &command.format)
    }
}
