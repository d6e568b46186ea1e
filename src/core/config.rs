// 設定ファイル管理
//
// 設定ファイル（YAML形式）の読み込み、検証、
// 名前付きデータベース接続設定の管理を行います。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// データベース方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "sqlite")]
    SQLite,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "postgresql"),
            Dialect::MySQL => write!(f, "mysql"),
            Dialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Dialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgresql" | "postgres" => Ok(Dialect::PostgreSQL),
            "mysql" => Ok(Dialect::MySQL),
            "sqlite" => Ok(Dialect::SQLite),
            other => Err(anyhow!(
                "Unsupported database dialect: {}. Please specify one of: postgresql, mysql, sqlite.",
                other
            )),
        }
    }
}

/// ツール設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// 名前付きの接続設定
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// 設定ファイルを読み込んで検証する
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    /// 指定された名前の接続設定を取得
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionConfig> {
        self.connections.get(name).ok_or_else(|| {
            let mut available: Vec<&String> = self.connections.keys().collect();
            available.sort();
            anyhow!(
                "Connection '{}' not found. Available connections: {:?}",
                name,
                available
            )
        })
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(anyhow!("Config file version is not specified"));
        }

        for (name, connection) in &self.connections {
            connection
                .validate()
                .with_context(|| format!("Invalid config for connection '{}'", name))?;
        }

        Ok(())
    }
}

/// std::str::FromStrトレイトの実装
impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse config file")
    }
}

/// 名前付き接続の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// データベース方言
    pub dialect: Dialect,

    /// ホスト名（SQLiteの場合は不要）
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号（未指定時は方言の既定値）
    pub port: Option<u16>,

    /// 既定のデータベース名（CREATE DATABASE 実行時の接続先）
    #[serde(default)]
    pub database: String,

    /// ユーザー名
    pub user: Option<String>,

    /// パスワード
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    pub timeout: Option<u64>,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl ConnectionConfig {
    /// 接続設定を検証
    pub fn validate(&self) -> Result<()> {
        if self.dialect != Dialect::SQLite && self.host.is_empty() {
            return Err(anyhow!("Host is not specified"));
        }
        Ok(())
    }

    /// 指定したデータベースに向けたDatabaseConfigを作成
    pub fn database_config(&self, database_name: &str) -> DatabaseConfig {
        DatabaseConfig {
            host: self.host.clone(),
            port: self.port.unwrap_or_else(|| default_port(self.dialect)),
            database: database_name.to_string(),
            user: self.user.clone(),
            password: self.password.clone(),
            timeout: self.timeout,
        }
    }

    /// 既定データベースに向けたDatabaseConfigを作成
    pub fn default_database_config(&self) -> DatabaseConfig {
        self.database_config(&self.database)
    }
}

fn default_port(dialect: Dialect) -> u16 {
    match dialect {
        Dialect::PostgreSQL => 5432,
        Dialect::MySQL => 3306,
        Dialect::SQLite => 0,
    }
}

/// データベース接続設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::PostgreSQL.to_string(), "postgresql");
        assert_eq!(Dialect::MySQL.to_string(), "mysql");
        assert_eq!(Dialect::SQLite.to_string(), "sqlite");
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgres".parse::<Dialect>().unwrap(), Dialect::PostgreSQL);
        assert_eq!("sqlite".parse::<Dialect>().unwrap(), Dialect::SQLite);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
version: "1.0"
connections:
  local:
    dialect: sqlite
    database: ./dev.db
  staging:
    dialect: postgresql
    host: db.internal
    database: postgres
    user: app
    password: secret
    timeout: 10
"#;
        let config: Config = yaml.parse().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.connections.len(), 2);

        let staging = config.get_connection("staging").unwrap();
        let db = staging.database_config("orders");
        assert_eq!(db.host, "db.internal");
        assert_eq!(db.port, 5432);
        assert_eq!(db.database, "orders");
        assert_eq!(db.timeout, Some(10));
    }

    #[test]
    fn test_unknown_connection() {
        let config: Config = "version: \"1.0\"\nconnections: {}\n".parse().unwrap();
        let err = config.get_connection("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validate_empty_version() {
        let config = Config {
            version: String::new(),
            connections: HashMap::new(),
        };
        assert!(config.validate().is_err());
    }
}
