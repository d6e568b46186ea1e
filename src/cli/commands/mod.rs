// コマンドハンドラー層
// 各CLIコマンドの実装

pub mod compare;
pub mod deploy;
pub mod export;
pub mod import;
pub mod publish;
pub mod script;

use crate::cli::command_context::into_result;
use crate::cli::OutputFormat;
use crate::core::endpoint::EndpointDescriptor;
use crate::core::error::CompareError;
use crate::core::operation::CancellationToken;
use crate::core::schema_diff::{ChangeKind, DiffEntry};
use crate::services::schema_compare_api::{
    CompareRequest, CompareResponse, SchemaCompareApi, ToggleRequest,
};
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Serialize;

/// コマンド出力の共通インターフェース
pub trait CommandOutput: Serialize {
    /// テキスト形式の出力
    fn to_text(&self) -> String;
}

/// 出力フォーマットに応じて文字列化
pub fn render_output<T: CommandOutput>(output: &T, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(output.to_text()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(output).with_context(|| "Failed to serialize output to JSON")
        }
    }
}

/// 比較を実行し、指定された名前の差分を除外する
///
/// 名前はテーブル名、または子オブジェクトの修飾名（`table.column` など）。
/// 子オブジェクトを指定した場合はそれを含むテーブル単位で除外されます。
pub(crate) async fn compare_with_exclusions(
    api: &SchemaCompareApi,
    source: EndpointDescriptor,
    target: EndpointDescriptor,
    excludes: &[String],
    token: &CancellationToken,
) -> Result<CompareResponse> {
    let response = into_result(
        api.compare(
            CompareRequest {
                operation_id: None,
                source,
                target,
            },
            token,
        )
        .await,
    )?;

    if !response.is_valid {
        return Err(anyhow!(
            "Comparison failed: {}",
            response.error_message.as_deref().unwrap_or("unknown error")
        ));
    }

    for name in excludes {
        let entry = find_entry(&response.differences, name).ok_or_else(|| {
            CompareError::EntryNotFound {
                entry: name.clone(),
            }
        })?;
        api.set_inclusion(ToggleRequest {
            operation_id: response.operation_id.clone(),
            entry: entry.clone(),
            included: false,
        })
        .await?;
    }

    Ok(response)
}

fn find_entry<'a>(entries: &'a [DiffEntry], name: &str) -> Option<&'a DiffEntry> {
    entries.iter().find_map(|entry| {
        if entry.name == name {
            Some(entry)
        } else {
            find_entry(&entry.children, name)
        }
    })
}

/// 差分エントリを記号付きの行に整形
pub(crate) fn format_entries(entries: &[DiffEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in entries {
        lines.push(format!("  {}", format_entry(entry)));
        for child in &entry.children {
            lines.push(format!("      {}", format_entry(child)));
        }
    }
    lines
}

fn format_entry(entry: &DiffEntry) -> String {
    let marker = match entry.change_kind {
        ChangeKind::Add => "+".green(),
        ChangeKind::Drop => "-".red(),
        ChangeKind::Change => "~".yellow(),
    };
    let label = format!("{} {}", entry.kind, entry.name);
    if entry.included {
        format!("{} {}", marker, label)
    } else {
        format!("{} {} {}", marker, label.dimmed(), "(excluded)".dimmed())
    }
}
