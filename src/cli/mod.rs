// CLI Layer
// ユーザー入力の受付とコマンドルーティング

pub mod command_context;
pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 出力フォーマット
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// Structured JSON output
    Json,
}

/// Schemacompare - Schema comparison and selective publish CLI
#[derive(Parser, Debug)]
#[command(name = "schemacompare")]
#[command(author = "Schemacompare Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compare database schemas and publish selected differences")]
#[command(long_about = "Schemacompare - Schema comparison and selective publish CLI

Compares two schema endpoints (live databases or schema packages),
generates deployment scripts for the differences you keep, and publishes
them to the target.

Endpoints are written as:
  db:<connection>/<database>    a database on a named connection from the config file
  package:<path>                a schema package file

Supported databases: PostgreSQL, MySQL, SQLite")]
#[command(propagate_version = true)]
#[command(after_help = "GETTING STARTED:
  1. Describe your connections in .schemacompare.yaml
  2. Compare two endpoints:   schemacompare compare --source db:local/dev.db --target db:local/prod.db
  3. Review the script:       schemacompare script --source ... --target ... --exclude legacy_table
  4. Publish:                 schemacompare publish --source ... --target ...

For detailed help on each command, use: schemacompare <command> --help")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two schema endpoints
    ///
    /// EXAMPLES:
    ///   schemacompare compare --source package:app.dacpac --target db:local/app.db
    Compare {
        /// Source endpoint (the desired schema)
        #[arg(short, long, value_name = "ENDPOINT")]
        source: String,

        /// Target endpoint (the schema to be changed)
        #[arg(short, long, value_name = "ENDPOINT")]
        target: String,
    },

    /// Generate a deployment script for the included differences
    ///
    /// EXAMPLES:
    ///   # Script every difference
    ///   schemacompare script --source db:local/dev.db --target db:local/prod.db
    ///
    ///   # Leave one table out and write the script to a file
    ///   schemacompare script -s db:local/dev.db -t db:local/prod.db --exclude audit_log -o deploy.sql
    Script {
        /// Source endpoint (the desired schema)
        #[arg(short, long, value_name = "ENDPOINT")]
        source: String,

        /// Target endpoint (the schema to be changed)
        #[arg(short, long, value_name = "ENDPOINT")]
        target: String,

        /// Exclude a difference by object name (repeatable)
        #[arg(short, long, value_name = "NAME")]
        exclude: Vec<String>,

        /// Write the script to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Publish the included differences to the target database
    ///
    /// EXAMPLES:
    ///   schemacompare publish --source package:app.dacpac --target db:local/app.db
    ///
    ///   # Show what would be applied
    ///   schemacompare publish -s package:app.dacpac -t db:local/app.db --dry-run
    Publish {
        /// Source endpoint (the desired schema)
        #[arg(short, long, value_name = "ENDPOINT")]
        source: String,

        /// Target endpoint (must be a database)
        #[arg(short, long, value_name = "ENDPOINT")]
        target: String,

        /// Exclude a difference by object name (repeatable)
        #[arg(short, long, value_name = "NAME")]
        exclude: Vec<String>,

        /// Dry run - generate the script without touching the target
        #[arg(long)]
        dry_run: bool,
    },

    /// Export schema and data of a database to a full package
    Export {
        /// Connection name from the config file
        #[arg(long, value_name = "NAME")]
        connection: String,

        /// Database name (file path for SQLite)
        #[arg(short, long, value_name = "DATABASE")]
        database: String,

        /// Package file to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Dry run - read the database without writing the package
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract the schema of a database to a schema package
    Extract {
        /// Connection name from the config file
        #[arg(long, value_name = "NAME")]
        connection: String,

        /// Database name (file path for SQLite)
        #[arg(short, long, value_name = "DATABASE")]
        database: String,

        /// Package file to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Application name recorded in the package
        #[arg(long, value_name = "NAME")]
        app_name: Option<String>,

        /// Application version recorded in the package
        #[arg(long, value_name = "VERSION")]
        app_version: Option<String>,

        /// Dry run - read the database without writing the package
        #[arg(long)]
        dry_run: bool,
    },

    /// Create a new database from a full package, including its data
    Import {
        /// Connection name from the config file
        #[arg(long, value_name = "NAME")]
        connection: String,

        /// Database to create (file path for SQLite)
        #[arg(short, long, value_name = "DATABASE")]
        database: String,

        /// Package file to import
        #[arg(short, long, value_name = "FILE")]
        package: PathBuf,

        /// Dry run - print the script without creating the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Deploy the schema of a package to a database
    Deploy {
        /// Connection name from the config file
        #[arg(long, value_name = "NAME")]
        connection: String,

        /// Target database (file path for SQLite)
        #[arg(short, long, value_name = "DATABASE")]
        database: String,

        /// Package file to deploy
        #[arg(short, long, value_name = "FILE")]
        package: PathBuf,

        /// Upgrade an existing database instead of creating a new one
        #[arg(long)]
        upgrade_existing: bool,

        /// Dry run - print the script without touching the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Report the actions a deployment of a package would perform
    DeployReport {
        /// Connection name from the config file
        #[arg(long, value_name = "NAME")]
        connection: String,

        /// Target database (file path for SQLite)
        #[arg(short, long, value_name = "DATABASE")]
        database: String,

        /// Package file to compare against the database
        #[arg(short, long, value_name = "FILE")]
        package: PathBuf,
    },
}
