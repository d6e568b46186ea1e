use anyhow::{Context, Result};
use clap::Parser;
use colored::control as color_control;
use schemacompare::cli::commands::compare::{CompareCommand, CompareCommandHandler};
use schemacompare::cli::commands::deploy::{
    DeployCommand, DeployCommandHandler, DeployReportCommand, DeployReportCommandHandler,
};
use schemacompare::cli::commands::export::{ExportCommand, ExportCommandHandler};
use schemacompare::cli::commands::import::{ImportCommand, ImportCommandHandler};
use schemacompare::cli::commands::publish::{PublishCommand, PublishCommandHandler};
use schemacompare::cli::commands::script::{ScriptCommand, ScriptCommandHandler};
use schemacompare::cli::{Cli, Commands};
use schemacompare::core::naming::LOG_ENV_VAR;
use std::env;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    sqlx::any::install_default_drivers();

    // CLIをパースして実行
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// ログ出力を初期化（標準エラー出力）
///
/// `--verbose` ならdebug、そうでなければ SCHEMACOMPARE_LOG / RUST_LOG、既定はwarn。
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    let project_path = env::current_dir()?;

    // --config フラグの処理（絶対パスに変換）
    let config_path: Option<PathBuf> = cli.config.map(|p| {
        if p.is_absolute() {
            p
        } else {
            project_path.join(p)
        }
    });
    let format = cli.format;

    match cli.command {
        Commands::Compare { source, target } => {
            let handler = CompareCommandHandler::new();
            let command = CompareCommand {
                project_path,
                config_path,
                source,
                target,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Script {
            source,
            target,
            exclude,
            output,
        } => {
            let handler = ScriptCommandHandler::new();
            let command = ScriptCommand {
                project_path,
                config_path,
                source,
                target,
                exclude,
                output,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Publish {
            source,
            target,
            exclude,
            dry_run,
        } => {
            let handler = PublishCommandHandler::new();
            let command = PublishCommand {
                project_path,
                config_path,
                source,
                target,
                exclude,
                dry_run,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Export {
            connection,
            database,
            output,
            dry_run,
        } => {
            let handler = ExportCommandHandler::new();
            let command = ExportCommand {
                project_path,
                config_path,
                connection,
                database,
                output,
                include_data: true,
                application_name: None,
                application_version: None,
                dry_run,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Extract {
            connection,
            database,
            output,
            app_name,
            app_version,
            dry_run,
        } => {
            let handler = ExportCommandHandler::new();
            let command = ExportCommand {
                project_path,
                config_path,
                connection,
                database,
                output,
                include_data: false,
                application_name: app_name,
                application_version: app_version,
                dry_run,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Import {
            connection,
            database,
            package,
            dry_run,
        } => {
            let handler = ImportCommandHandler::new();
            let command = ImportCommand {
                project_path,
                config_path,
                connection,
                database,
                package,
                dry_run,
                format,
            };
            handler.execute(&command).await
        }

        Commands::Deploy {
            connection,
            database,
            package,
            upgrade_existing,
            dry_run,
        } => {
            let handler = DeployCommandHandler::new();
            let command = DeployCommand {
                project_path,
                config_path,
                connection,
                database,
                package,
                upgrade_existing,
                dry_run,
                format,
            };
            handler.execute(&command).await
        }

        Commands::DeployReport {
            connection,
            database,
            package,
        } => {
            let handler = DeployReportCommandHandler::new();
            let command = DeployReportCommand {
                project_path,
                config_path,
                connection,
                database,
                package,
                format,
            };
            handler.execute(&command).await
        }
    }
}
