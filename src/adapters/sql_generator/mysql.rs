// MySQL用SQLジェネレーター
//
// スキーマ差分からMySQL用のALTER TABLE文を生成します。
// カラム変更はMODIFY COLUMNで定義全体を置き換えます。

use crate::adapters::sql_generator::{require_constraint_name, SqlGenerator};
use crate::adapters::sql_quote::quote_columns;
use crate::core::config::Dialect;
use crate::core::error::CompareError;
use crate::core::schema::Table;
use crate::core::schema_diff::TableDiff;

/// MySQL用SQLジェネレーター
#[derive(Debug, Clone, Default)]
pub struct MySqlSqlGenerator {}

impl MySqlSqlGenerator {
    /// 新しいMySqlSqlGeneratorを作成
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlGenerator for MySqlSqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
    }

    fn generate_alter_table(
        &self,
        source: &Table,
        _target: &Table,
        diff: &TableDiff,
    ) -> Result<Vec<String>, CompareError> {
        let table = self.quote(&diff.table_name);
        let mut statements = Vec::new();

        for foreign_key in &diff.removed_foreign_keys {
            let name = require_constraint_name(&diff.table_name, foreign_key)?;
            statements.push(format!(
                "ALTER TABLE {} DROP FOREIGN KEY {};",
                table,
                self.quote(name)
            ));
        }

        if let Some((old_key, _)) = &diff.primary_key_change {
            if !old_key.is_empty() {
                statements.push(format!("ALTER TABLE {} DROP PRIMARY KEY;", table));
            }
        }

        for column in &diff.removed_columns {
            statements.push(format!(
                "ALTER TABLE {} DROP COLUMN {};",
                table,
                self.quote(&column.name)
            ));
        }

        for column_diff in &diff.modified_columns {
            statements.push(format!(
                "ALTER TABLE {} MODIFY COLUMN {};",
                table,
                self.generate_column_definition(&column_diff.new_column)
            ));
        }

        for column in &diff.added_columns {
            statements.push(format!(
                "ALTER TABLE {} ADD COLUMN {};",
                table,
                self.generate_column_definition(column)
            ));
        }

        if diff.primary_key_change.is_some() && !source.primary_key.is_empty() {
            statements.push(format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({});",
                table,
                quote_columns(Dialect::MySQL, &source.primary_key)
            ));
        }

        for foreign_key in &diff.added_foreign_keys {
            statements.push(format!(
                "ALTER TABLE {} ADD {};",
                table,
                self.generate_foreign_key_clause(foreign_key)
            ));
        }

        Ok(statements)
    }
}
