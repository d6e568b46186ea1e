// データベースイントロスペクター
//
// ライブデータベースからスキーマ情報と行データを取得するための抽象化レイヤー。
// 各方言固有のシステムカタログ/PRAGMAクエリを実装します。

use crate::adapters::sql_quote::{quote_identifier, quote_identifier_double};
use crate::core::config::Dialect;
use crate::core::package::TableData;
use crate::core::schema::{Column, ForeignKey, Schema, Table};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};
use std::collections::BTreeMap;

/// データベーススキーマ取得インターフェース
///
/// 各データベース方言固有のイントロスペクション処理を抽象化します。
#[async_trait]
pub trait DatabaseIntrospector: Send + Sync {
    /// テーブル名一覧を取得（名前順）
    async fn get_table_names(&self, pool: &AnyPool) -> Result<Vec<String>>;

    /// カラム定義を取得（定義順）
    async fn get_columns(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<Column>>;

    /// プライマリキーのカラムを取得（キー内の順序）
    async fn get_primary_key(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<String>>;

    /// 外部キーを取得
    async fn get_foreign_keys(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<ForeignKey>>;

    /// カラムを文字列として取り出すSELECT式
    fn text_expression(&self, column: &str) -> String;
}

/// PostgreSQL用イントロスペクター
pub struct PostgresIntrospector;

/// MySQL用イントロスペクター
pub struct MySqlIntrospector;

/// SQLite用イントロスペクター
pub struct SqliteIntrospector;

/// 方言に応じたイントロスペクターを作成
pub fn create_introspector(dialect: Dialect) -> Box<dyn DatabaseIntrospector> {
    match dialect {
        Dialect::PostgreSQL => Box::new(PostgresIntrospector),
        Dialect::MySQL => Box::new(MySqlIntrospector),
        Dialect::SQLite => Box::new(SqliteIntrospector),
    }
}

/// データベースからスキーマ全体を読み込む
///
/// # Arguments
///
/// * `dialect` - データベース方言
/// * `pool` - 接続プール
///
/// # Returns
///
/// テーブル、カラム、プライマリキー、外部キーを含むスキーマ
pub async fn introspect_schema(dialect: Dialect, pool: &AnyPool) -> Result<Schema> {
    let introspector = create_introspector(dialect);
    let mut schema = Schema::new(Some(dialect));

    let table_names = introspector
        .get_table_names(pool)
        .await
        .with_context(|| "Failed to get table names")?;

    for table_name in table_names {
        let table = read_table(introspector.as_ref(), pool, &table_name)
            .await
            .with_context(|| format!("Failed to get table info for '{}'", table_name))?;
        schema.add_table(table);
    }

    Ok(schema)
}

async fn read_table(
    introspector: &dyn DatabaseIntrospector,
    pool: &AnyPool,
    table_name: &str,
) -> Result<Table> {
    let mut table = Table::new(table_name);
    table.columns = introspector.get_columns(pool, table_name).await?;
    table.primary_key = introspector.get_primary_key(pool, table_name).await?;
    table.foreign_keys = introspector.get_foreign_keys(pool, table_name).await?;
    Ok(table)
}

/// テーブルの全行を文字列表現で読み込む
pub async fn read_table_data(dialect: Dialect, pool: &AnyPool, table: &Table) -> Result<TableData> {
    let introspector = create_introspector(dialect);
    let columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    if columns.is_empty() {
        return Ok(TableData::default());
    }

    let select_list = columns
        .iter()
        .map(|c| introspector.text_expression(c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!(
        "SELECT {} FROM {}",
        select_list,
        quote_identifier(dialect, &table.name)
    );
    if !table.primary_key.is_empty() {
        let order_by = table
            .primary_key
            .iter()
            .map(|c| quote_identifier(dialect, c))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" ORDER BY {}", order_by));
    }

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to read rows from '{}'", table.name))?;

    let mut data = TableData {
        columns,
        rows: Vec::with_capacity(rows.len()),
    };
    for row in &rows {
        let values = (0..data.columns.len())
            .map(|i| row.try_get::<Option<String>, _>(i))
            .collect::<Result<Vec<_>, _>>()?;
        data.rows.push(values);
    }
    Ok(data)
}

/// 全テーブルの行データを読み込む
pub async fn read_schema_data(
    dialect: Dialect,
    pool: &AnyPool,
    schema: &Schema,
) -> Result<BTreeMap<String, TableData>> {
    let mut data = BTreeMap::new();
    for table in schema.tables.values() {
        data.insert(table.name.clone(), read_table_data(dialect, pool, table).await?);
    }
    Ok(data)
}

fn string_column(row: &AnyRow, index: usize) -> Result<String> {
    Ok(row.try_get::<String, _>(index)?)
}

/// (制約名, 参照元カラム, 参照先テーブル, 参照先カラム) の行を外部キーにまとめる
fn group_foreign_keys(rows: &[AnyRow]) -> Result<Vec<ForeignKey>> {
    let mut foreign_keys: Vec<ForeignKey> = Vec::new();
    for row in rows {
        let constraint_name = string_column(row, 0)?;
        let column = string_column(row, 1)?;
        let referenced_table = string_column(row, 2)?;
        let referenced_column = string_column(row, 3)?;

        match foreign_keys
            .iter_mut()
            .find(|fk| fk.name.as_deref() == Some(constraint_name.as_str()))
        {
            Some(fk) => {
                fk.columns.push(column);
                fk.referenced_columns.push(referenced_column);
            }
            None => foreign_keys.push(ForeignKey {
                name: Some(constraint_name),
                columns: vec![column],
                referenced_table,
                referenced_columns: vec![referenced_column],
            }),
        }
    }
    Ok(foreign_keys)
}

// =============================================================================
// PostgreSQL イントロスペクター実装
// =============================================================================

#[async_trait]
impl DatabaseIntrospector for PostgresIntrospector {
    async fn get_table_names(&self, pool: &AnyPool) -> Result<Vec<String>> {
        let sql = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(sql).fetch_all(pool).await?;
        rows.iter().map(|row| string_column(row, 0)).collect()
    }

    async fn get_columns(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<Column>> {
        let sql = r#"
            SELECT
                a.attname::text,
                format_type(a.atttypid, a.atttypmod),
                a.attnotnull,
                pg_get_expr(d.adbin, d.adrelid)
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE c.relname = $1
                AND n.nspname = 'public'
                AND a.attnum > 0
                AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let rows = sqlx::query(sql).bind(table_name).fetch_all(pool).await?;
        rows.iter()
            .map(|row| {
                let not_null: bool = row.try_get(2)?;
                Ok(Column {
                    name: string_column(row, 0)?,
                    data_type: string_column(row, 1)?,
                    nullable: !not_null,
                    default_value: row.try_get(3)?,
                })
            })
            .collect()
    }

    async fn get_primary_key(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<String>> {
        let sql = r#"
            SELECT a.attname::text
            FROM pg_index i
            JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
            JOIN pg_class c ON c.oid = i.indrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE i.indisprimary
                AND c.relname = $1
                AND n.nspname = 'public'
            ORDER BY array_position(i.indkey, a.attnum)
        "#;

        let rows = sqlx::query(sql).bind(table_name).fetch_all(pool).await?;
        rows.iter().map(|row| string_column(row, 0)).collect()
    }

    async fn get_foreign_keys(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<ForeignKey>> {
        // 複合外部キーはconkey/confkeyの位置で対応付ける
        let sql = r#"
            SELECT
                con.conname::text,
                att.attname::text,
                ref.relname::text,
                ratt.attname::text
            FROM pg_constraint con
            JOIN pg_class cl ON cl.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = cl.relnamespace
            JOIN pg_class ref ON ref.oid = con.confrelid
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
            JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = k.attnum
            JOIN pg_attribute ratt ON ratt.attrelid = con.confrelid AND ratt.attnum = k.refnum
            WHERE con.contype = 'f'
                AND cl.relname = $1
                AND n.nspname = 'public'
            ORDER BY con.conname, k.ord
        "#;

        let rows = sqlx::query(sql).bind(table_name).fetch_all(pool).await?;
        group_foreign_keys(&rows)
    }

    fn text_expression(&self, column: &str) -> String {
        format!("{}::text", quote_identifier_double(column))
    }
}

// =============================================================================
// MySQL イントロスペクター実装
// =============================================================================

#[async_trait]
impl DatabaseIntrospector for MySqlIntrospector {
    async fn get_table_names(&self, pool: &AnyPool) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR)
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(sql).fetch_all(pool).await?;
        rows.iter().map(|row| string_column(row, 0)).collect()
    }

    async fn get_columns(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<Column>> {
        let sql = r#"
            SELECT
                CAST(column_name AS CHAR),
                CAST(column_type AS CHAR),
                CAST(is_nullable AS CHAR),
                CAST(column_default AS CHAR)
            FROM information_schema.columns
            WHERE table_name = ? AND table_schema = DATABASE()
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(sql).bind(table_name).fetch_all(pool).await?;
        rows.iter()
            .map(|row| {
                Ok(Column {
                    name: string_column(row, 0)?,
                    data_type: string_column(row, 1)?,
                    nullable: string_column(row, 2)? == "YES",
                    default_value: row.try_get(3)?,
                })
            })
            .collect()
    }

    async fn get_primary_key(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(column_name AS CHAR)
            FROM information_schema.statistics
            WHERE table_name = ? AND table_schema = DATABASE()
                AND index_name = 'PRIMARY'
            ORDER BY seq_in_index
        "#;

        let rows = sqlx::query(sql).bind(table_name).fetch_all(pool).await?;
        rows.iter().map(|row| string_column(row, 0)).collect()
    }

    async fn get_foreign_keys(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<ForeignKey>> {
        let sql = r#"
            SELECT
                CAST(constraint_name AS CHAR),
                CAST(column_name AS CHAR),
                CAST(referenced_table_name AS CHAR),
                CAST(referenced_column_name AS CHAR)
            FROM information_schema.key_column_usage
            WHERE table_name = ? AND table_schema = DATABASE()
                AND referenced_table_name IS NOT NULL
            ORDER BY constraint_name, ordinal_position
        "#;

        let rows = sqlx::query(sql).bind(table_name).fetch_all(pool).await?;
        group_foreign_keys(&rows)
    }

    fn text_expression(&self, column: &str) -> String {
        format!("CAST({} AS CHAR)", quote_identifier(Dialect::MySQL, column))
    }
}

// =============================================================================
// SQLite イントロスペクター実装
// =============================================================================

#[async_trait]
impl DatabaseIntrospector for SqliteIntrospector {
    async fn get_table_names(&self, pool: &AnyPool) -> Result<Vec<String>> {
        let sql = r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table'
                AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;

        let rows = sqlx::query(sql).fetch_all(pool).await?;
        rows.iter().map(|row| string_column(row, 0)).collect()
    }

    async fn get_columns(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<Column>> {
        let sql = format!(
            "PRAGMA table_info({})",
            quote_identifier_double(table_name)
        );
        let rows = sqlx::query(&sql).fetch_all(pool).await?;

        rows.iter()
            .map(|row| {
                let not_null: i64 = row.try_get(3)?;
                Ok(Column {
                    name: string_column(row, 1)?,
                    data_type: string_column(row, 2)?,
                    nullable: not_null == 0,
                    default_value: row.try_get(4)?,
                })
            })
            .collect()
    }

    async fn get_primary_key(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<String>> {
        let sql = format!(
            "PRAGMA table_info({})",
            quote_identifier_double(table_name)
        );
        let rows = sqlx::query(&sql).fetch_all(pool).await?;

        // pk列はキー内の位置（1始まり）、キーに含まれないカラムは0
        let mut pk_columns: Vec<(i64, String)> = Vec::new();
        for row in &rows {
            let position: i64 = row.try_get(5)?;
            if position > 0 {
                pk_columns.push((position, string_column(row, 1)?));
            }
        }
        pk_columns.sort_by_key(|(position, _)| *position);

        Ok(pk_columns.into_iter().map(|(_, name)| name).collect())
    }

    async fn get_foreign_keys(&self, pool: &AnyPool, table_name: &str) -> Result<Vec<ForeignKey>> {
        let sql = format!(
            "PRAGMA foreign_key_list({})",
            quote_identifier_double(table_name)
        );
        let rows = sqlx::query(&sql).fetch_all(pool).await?;

        // id -> (seq, from, table, to)
        let mut grouped: BTreeMap<i64, Vec<(i64, String, String, Option<String>)>> =
            BTreeMap::new();
        for row in &rows {
            let id: i64 = row.try_get(0)?;
            let seq: i64 = row.try_get(1)?;
            let referenced_table = string_column(row, 2)?;
            let from = string_column(row, 3)?;
            let to: Option<String> = row.try_get(4)?;
            grouped
                .entry(id)
                .or_default()
                .push((seq, from, referenced_table, to));
        }

        let mut foreign_keys = Vec::new();
        for (_, mut parts) in grouped {
            parts.sort_by_key(|(seq, ..)| *seq);
            let referenced_table = parts
                .first()
                .map(|(_, _, table, _)| table.clone())
                .unwrap_or_default();
            let columns = parts.iter().map(|(_, from, ..)| from.clone()).collect();
            // 参照先カラム省略時（プライマリキー参照）はtoがNULLになる
            let referenced_columns = parts.iter().filter_map(|(.., to)| to.clone()).collect();
            foreign_keys.push(ForeignKey {
                name: None,
                columns,
                referenced_table,
                referenced_columns,
            });
        }

        Ok(foreign_keys)
    }

    fn text_expression(&self, column: &str) -> String {
        format!("CAST({} AS TEXT)", quote_identifier_double(column))
    }
}
