// SQL生成アダプター
//
// スキーマ定義と差分から各データベース方言用のDDL/DML文を生成するアダプター層。

pub mod mysql;
pub mod postgres;
pub mod sqlite;

use crate::adapters::sql_quote::{quote_columns, quote_identifier, quote_literal};
use crate::core::config::Dialect;
use crate::core::error::CompareError;
use crate::core::package::TableData;
use crate::core::schema::{Column, ForeignKey, Table};
use crate::core::schema_diff::TableDiff;

use self::mysql::MySqlSqlGenerator;
use self::postgres::PostgresSqlGenerator;
use self::sqlite::SqliteSqlGenerator;

/// SQLジェネレータートレイト
///
/// 各データベース方言用のSQLジェネレーターが実装すべきインターフェース。
/// 共通の文法はデフォルト実装で提供し、方言差はオーバーライドで吸収します。
pub trait SqlGenerator: Send + Sync {
    /// 対象のデータベース方言
    fn dialect(&self) -> Dialect;

    /// 識別子をクォート
    fn quote(&self, name: &str) -> String {
        quote_identifier(self.dialect(), name)
    }

    /// カラム定義のSQL文字列を生成
    fn generate_column_definition(&self, column: &Column) -> String {
        let mut parts = vec![self.quote(&column.name)];

        if !column.data_type.is_empty() {
            parts.push(column.data_type.clone());
        }

        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }

        if let Some(ref default_value) = column.default_value {
            parts.push(format!("DEFAULT {}", default_value));
        }

        parts.join(" ")
    }

    /// FOREIGN KEY句を生成
    fn generate_foreign_key_clause(&self, foreign_key: &ForeignKey) -> String {
        let mut clause = format!(
            "FOREIGN KEY ({}) REFERENCES {}",
            quote_columns(self.dialect(), &foreign_key.columns),
            self.quote(&foreign_key.referenced_table)
        );
        if !foreign_key.referenced_columns.is_empty() {
            clause.push_str(&format!(
                " ({})",
                quote_columns(self.dialect(), &foreign_key.referenced_columns)
            ));
        }
        match &foreign_key.name {
            Some(name) if self.dialect() != Dialect::SQLite => {
                format!("CONSTRAINT {} {}", self.quote(name), clause)
            }
            _ => clause,
        }
    }

    /// CREATE TABLE文を生成
    ///
    /// # Arguments
    ///
    /// * `table` - テーブル定義
    ///
    /// # Returns
    ///
    /// CREATE TABLE文のSQL文字列
    fn generate_create_table(&self, table: &Table) -> String {
        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|column| format!("    {}", self.generate_column_definition(column)))
            .collect();

        if !table.primary_key.is_empty() {
            definitions.push(format!(
                "    PRIMARY KEY ({})",
                quote_columns(self.dialect(), &table.primary_key)
            ));
        }

        for foreign_key in &table.foreign_keys {
            definitions.push(format!("    {}", self.generate_foreign_key_clause(foreign_key)));
        }

        format!(
            "CREATE TABLE {} (\n{}\n);",
            self.quote(&table.name),
            definitions.join(",\n")
        )
    }

    /// DROP TABLE文を生成
    fn generate_drop_table(&self, table_name: &str) -> String {
        format!("DROP TABLE {};", self.quote(table_name))
    }

    /// CREATE DATABASE文を生成
    fn generate_create_database(&self, database_name: &str) -> String {
        format!("CREATE DATABASE {};", self.quote(database_name))
    }

    /// 行データのINSERT文を生成（1行1文）
    ///
    /// 値は文字列リテラルとして挿入し、型変換はデータベースに任せます。
    fn generate_insert(&self, table_name: &str, data: &TableData) -> Vec<String> {
        let columns = quote_columns(self.dialect(), &data.columns);
        data.rows
            .iter()
            .map(|row| {
                let values = row
                    .iter()
                    .map(|value| quote_literal(value.as_deref()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "INSERT INTO {} ({}) VALUES ({});",
                    self.quote(table_name),
                    columns,
                    values
                )
            })
            .collect()
    }

    /// ターゲット側のテーブルをソース側の定義に合わせる文を生成
    ///
    /// # Arguments
    ///
    /// * `source` - あるべきテーブル定義
    /// * `target` - 現在のテーブル定義
    /// * `diff` - 両者の差分
    ///
    /// # Returns
    ///
    /// 実行順に並んだSQL文、生成できない場合はGenerationError
    fn generate_alter_table(
        &self,
        source: &Table,
        target: &Table,
        diff: &TableDiff,
    ) -> Result<Vec<String>, CompareError>;
}

/// 方言に応じたSQLジェネレーターを作成
pub fn create_generator(dialect: Dialect) -> Box<dyn SqlGenerator> {
    match dialect {
        Dialect::PostgreSQL => Box::new(PostgresSqlGenerator::new()),
        Dialect::MySQL => Box::new(MySqlSqlGenerator::new()),
        Dialect::SQLite => Box::new(SqliteSqlGenerator::new()),
    }
}

/// 外部キー削除に必要な制約名を取得
///
/// 名前を持たない外部キーはALTER TABLEで削除できないためエラーとします。
pub(crate) fn require_constraint_name<'a>(
    table_name: &str,
    foreign_key: &'a ForeignKey,
) -> Result<&'a str, CompareError> {
    foreign_key.name.as_deref().ok_or_else(|| {
        CompareError::generation(format!(
            "Cannot drop unnamed foreign key {} on table '{}'",
            foreign_key.display_name(),
            table_name
        ))
    })
}
