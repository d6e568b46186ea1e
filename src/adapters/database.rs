// データベース接続アダプター
//
// SQLxを使用したデータベース接続の管理を行います。
// 設定ファイルの名前付き接続からデータベースエンドポイントを解決する
// Connection Provider もここで提供します。

use crate::adapters::connection_string::{
    build_connection_string, build_create_connection_string,
};
use crate::adapters::database_introspector::introspect_schema;
use crate::adapters::sql_quote::quote_identifier;
use crate::core::config::{Config, ConnectionConfig, DatabaseConfig, Dialect};
use crate::core::error::CompareError;
use async_trait::async_trait;
use sqlx::pool::PoolOptions;
use sqlx::{Any, AnyPool, Connection};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// データベース接続サービス
///
/// データベース接続プールの初期化と管理を行います。
#[derive(Debug, Clone)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// データベース接続プールを作成
    ///
    /// # Arguments
    ///
    /// * `dialect` - データベース方言
    /// * `config` - データベース設定
    ///
    /// # Returns
    ///
    /// 接続プール、失敗時は設定エラー
    pub async fn create_pool(
        &self,
        dialect: Dialect,
        config: &DatabaseConfig,
    ) -> Result<AnyPool, CompareError> {
        self.connect_pool(dialect, config, build_connection_string(dialect, config))
            .await
    }

    /// データベース作成用の接続プールを作成（SQLiteはファイルが無ければ作成）
    pub async fn create_pool_for_create(
        &self,
        dialect: Dialect,
        config: &DatabaseConfig,
    ) -> Result<AnyPool, CompareError> {
        self.connect_pool(dialect, config, build_create_connection_string(dialect, config))
            .await
    }

    async fn connect_pool(
        &self,
        dialect: Dialect,
        config: &DatabaseConfig,
        connection_string: String,
    ) -> Result<AnyPool, CompareError> {
        sqlx::any::install_default_drivers();
        debug!(dialect = %dialect, database = %config.database, "Creating connection pool");

        self.create_pool_options(config.timeout)
            .connect(&connection_string)
            .await
            .map_err(|e| {
                CompareError::configuration(format!(
                    "Failed to connect to {} database '{}': {}",
                    dialect, config.database, e
                ))
            })
    }

    /// 接続テストを実行
    pub async fn test_connection(&self, pool: &AnyPool) -> Result<(), CompareError> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(|e| {
                CompareError::configuration(format!("Database connection test failed: {}", e))
            })
    }

    /// プールオプションを作成（タイムアウト未指定時は30秒）
    pub fn create_pool_options(&self, timeout_secs: Option<u64>) -> PoolOptions<Any> {
        PoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(timeout_secs.unwrap_or(30)))
    }
}

impl Default for DatabaseConnectionService {
    fn default() -> Self {
        Self::new()
    }
}

/// 接続済みデータベース
#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    pub pool: AnyPool,
    pub dialect: Dialect,
    pub database_name: String,
}

impl DatabaseHandle {
    /// 複数のSQL文を1つのトランザクションで実行
    ///
    /// SQLiteではテーブル再作成中の外部キー検査を避けるため、
    /// トランザクションの外側で foreign_keys を一時的に無効化します。
    pub async fn execute_in_transaction(&self, statements: &[String]) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        let toggle_foreign_keys = self.dialect == Dialect::SQLite;

        if toggle_foreign_keys {
            sqlx::query("PRAGMA foreign_keys = OFF")
                .execute(&mut *conn)
                .await?;
        }

        let result = async {
            let mut tx = conn.begin().await?;
            for statement in statements {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            tx.commit().await
        }
        .await;

        if toggle_foreign_keys {
            sqlx::query("PRAGMA foreign_keys = ON")
                .execute(&mut *conn)
                .await?;
        }

        result
    }

    /// テーブルが1つ以上存在するか
    pub async fn has_tables(&self) -> Result<bool, CompareError> {
        let schema = introspect_schema(self.dialect, &self.pool)
            .await
            .map_err(|e| CompareError::provider(format!("{:#}", e)))?;
        Ok(schema.table_count() > 0)
    }

    /// 接続プールを閉じる
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// データベースエンドポイントを接続に解決するインターフェース
///
/// 失敗はすべて設定エラーとして報告されます。
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// 名前付き接続の方言（接続はしない）
    fn dialect(&self, connection: &str) -> Result<Dialect, CompareError>;

    /// 名前付き接続上の指定データベースに接続
    async fn connect(
        &self,
        connection: &str,
        database_name: &str,
    ) -> Result<DatabaseHandle, CompareError>;

    /// 名前付き接続上にデータベースを新規作成
    async fn create_database(
        &self,
        connection: &str,
        database_name: &str,
    ) -> Result<(), CompareError>;
}

/// 設定ファイルの接続定義を使うConnection Provider
#[derive(Debug, Clone)]
pub struct ConfigConnectionProvider {
    config: Config,
    service: DatabaseConnectionService,
}

impl ConfigConnectionProvider {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            service: DatabaseConnectionService::new(),
        }
    }

    fn resolve(&self, connection: &str) -> Result<(Dialect, &ConnectionConfig), CompareError> {
        let connection_config = self
            .config
            .get_connection(connection)
            .map_err(|e| CompareError::configuration(e.to_string()))?;
        Ok((connection_config.dialect, connection_config))
    }
}

#[async_trait]
impl ConnectionProvider for ConfigConnectionProvider {
    fn dialect(&self, connection: &str) -> Result<Dialect, CompareError> {
        self.resolve(connection).map(|(dialect, _)| dialect)
    }

    async fn connect(
        &self,
        connection: &str,
        database_name: &str,
    ) -> Result<DatabaseHandle, CompareError> {
        let (dialect, connection_config) = self.resolve(connection)?;
        let database_config = connection_config.database_config(database_name);
        let pool = self.service.create_pool(dialect, &database_config).await?;

        Ok(DatabaseHandle {
            pool,
            dialect,
            database_name: database_name.to_string(),
        })
    }

    async fn create_database(
        &self,
        connection: &str,
        database_name: &str,
    ) -> Result<(), CompareError> {
        let (dialect, connection_config) = self.resolve(connection)?;

        match dialect {
            Dialect::SQLite => {
                if let Some(parent) = Path::new(database_name).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            CompareError::configuration(format!(
                                "Failed to create directory for '{}': {}",
                                database_name, e
                            ))
                        })?;
                    }
                }
                let pool = self
                    .service
                    .create_pool_for_create(dialect, &connection_config.database_config(database_name))
                    .await?;
                self.service.test_connection(&pool).await?;
                pool.close().await;
            }
            Dialect::PostgreSQL | Dialect::MySQL => {
                let pool = self
                    .service
                    .create_pool(dialect, &connection_config.default_database_config())
                    .await?;
                let sql = format!(
                    "CREATE DATABASE {}",
                    quote_identifier(dialect, database_name)
                );
                let result = sqlx::query(&sql).execute(&pool).await;
                pool.close().await;
                result.map_err(|e| {
                    CompareError::configuration(format!(
                        "Failed to create database '{}': {}",
                        database_name, e
                    ))
                })?;
            }
        }

        info!(connection = %connection, database = %database_name, "Database created");
        Ok(())
    }
}
