// エンドポイント記述子
//
// 比較対象となるスキーマの取得元（ライブデータベースまたはパッケージファイル）を表現します。

use crate::core::error::CompareError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// スキーマの取得元
///
/// 生成後は変更しません。エンジンは読み取りのみ行います。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointDescriptor {
    /// ライブデータベース
    Database {
        /// 設定ファイル上の接続名（サーバー参照）
        connection: Option<String>,
        /// データベース名（SQLiteではファイルパス）
        database_name: String,
    },
    /// スキーマパッケージ
    Package {
        /// パッケージファイルのパス
        path: PathBuf,
    },
}

impl EndpointDescriptor {
    /// データベースエンドポイントを作成
    pub fn database(connection: impl Into<String>, database_name: impl Into<String>) -> Self {
        EndpointDescriptor::Database {
            connection: Some(connection.into()),
            database_name: database_name.into(),
        }
    }

    /// パッケージエンドポイントを作成
    pub fn package(path: impl Into<PathBuf>) -> Self {
        EndpointDescriptor::Package { path: path.into() }
    }

    pub fn is_database(&self) -> bool {
        matches!(self, EndpointDescriptor::Database { .. })
    }

    pub fn is_package(&self) -> bool {
        matches!(self, EndpointDescriptor::Package { .. })
    }

    /// スキーマを解決できるだけの情報があるか検証
    ///
    /// 接続が指定されていないデータベースエンドポイントは設定エラーになります。
    pub fn validate(&self) -> Result<(), CompareError> {
        match self {
            EndpointDescriptor::Database {
                connection,
                database_name,
            } => {
                if connection.as_deref().map_or(true, str::is_empty) {
                    return Err(CompareError::configuration(format!(
                        "No connection supplied for database endpoint '{}'",
                        database_name
                    )));
                }
                if database_name.is_empty() {
                    return Err(CompareError::configuration(
                        "Database endpoint has an empty database name",
                    ));
                }
                Ok(())
            }
            EndpointDescriptor::Package { path } => {
                if path.as_os_str().is_empty() {
                    return Err(CompareError::configuration(
                        "Package endpoint has an empty path",
                    ));
                }
                Ok(())
            }
        }
    }

    /// 表示用の名前（データベース名またはファイル名）
    pub fn display_name(&self) -> String {
        match self {
            EndpointDescriptor::Database { database_name, .. } => database_name.clone(),
            EndpointDescriptor::Package { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointDescriptor::Database {
                connection: Some(connection),
                database_name,
            } => write!(f, "db:{}/{}", connection, database_name),
            EndpointDescriptor::Database {
                connection: None,
                database_name,
            } => write!(f, "db:{}", database_name),
            EndpointDescriptor::Package { path } => write!(f, "package:{}", path.display()),
        }
    }
}

/// `db:<connection>/<database>`、`db:<database>`、`package:<path>` 形式を解析
impl FromStr for EndpointDescriptor {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("package:") {
            return Ok(EndpointDescriptor::package(path));
        }

        if let Some(rest) = s.strip_prefix("db:") {
            return Ok(match rest.split_once('/') {
                Some((connection, database_name)) => EndpointDescriptor::Database {
                    connection: Some(connection.to_string()),
                    database_name: database_name.to_string(),
                },
                None => EndpointDescriptor::Database {
                    connection: None,
                    database_name: rest.to_string(),
                },
            });
        }

        Err(CompareError::configuration(format!(
            "Invalid endpoint '{}'. Use db:<connection>/<database> or package:<path>",
            s
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_database_endpoint() {
        let endpoint: EndpointDescriptor = "db:local/orders".parse().unwrap();
        assert_eq!(endpoint, EndpointDescriptor::database("local", "orders"));
        assert_eq!(endpoint.to_string(), "db:local/orders");
    }

    #[test]
    fn test_parse_sqlite_path_keeps_slashes() {
        let endpoint: EndpointDescriptor = "db:local//tmp/data/app.db".parse().unwrap();
        assert_eq!(
            endpoint,
            EndpointDescriptor::database("local", "/tmp/data/app.db")
        );
    }

    #[test]
    fn test_parse_package_endpoint() {
        let endpoint: EndpointDescriptor = "package:./out/app.dacpac".parse().unwrap();
        assert!(endpoint.is_package());
        assert_eq!(endpoint.display_name(), "app.dacpac");
    }

    #[test]
    fn test_parse_invalid_endpoint() {
        let err = "mysql://localhost".parse::<EndpointDescriptor>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_database_without_connection_is_configuration_error() {
        let endpoint: EndpointDescriptor = "db:orders".parse().unwrap();
        let err = endpoint.validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_serde_tagged_representation() {
        let endpoint = EndpointDescriptor::package("a.dacpac");
        let json = serde_json::to_string(&endpoint).unwrap();
        assert!(json.contains("\"type\":\"package\""));
        let back: EndpointDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, endpoint);
    }
}
