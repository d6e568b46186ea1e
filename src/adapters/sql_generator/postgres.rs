// PostgreSQL用SQLジェネレーター
//
// スキーマ差分からPostgreSQL用のALTER TABLE文を生成します。

use crate::adapters::sql_generator::{require_constraint_name, SqlGenerator};
use crate::adapters::sql_quote::quote_columns;
use crate::core::config::Dialect;
use crate::core::error::CompareError;
use crate::core::schema::Table;
use crate::core::schema_diff::{ColumnChange, TableDiff};

/// PostgreSQL用SQLジェネレーター
#[derive(Debug, Clone, Default)]
pub struct PostgresSqlGenerator {}

impl PostgresSqlGenerator {
    /// 新しいPostgresSqlGeneratorを作成
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlGenerator for PostgresSqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSQL
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
                "ALTER TABLE {} DROP CONSTRAINT {};",
                table,
                self.quote(name)
            ));
        }

        if let Some((old_key, _)) = &diff.primary_key_change {
            if !old_key.is_empty() {
                // 主キー制約は既定の命名規則（<table>_pkey）に従う前提
                statements.push(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {};",
                    table,
                    self.quote(&format!("{}_pkey", diff.table_name))
                ));
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
            let column = self.quote(&column_diff.column_name);
            for change in &column_diff.changes {
                let statement = match change {
                    ColumnChange::TypeChanged { new_type, .. } => format!(
                        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
                        table, column, new_type, column, new_type
                    ),
                    ColumnChange::NullableChanged { new_nullable, .. } => {
                        let action = if *new_nullable {
                            "DROP NOT NULL"
                        } else {
                            "SET NOT NULL"
                        };
                        format!("ALTER TABLE {} ALTER COLUMN {} {};", table, column, action)
                    }
                    ColumnChange::DefaultValueChanged { new_default, .. } => match new_default {
                        Some(value) => format!(
                            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};",
                            table, column, value
                        ),
                        None => format!(
                            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;",
                            table, column
                        ),
                    },
                };
                statements.push(statement);
            }
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
                quote_columns(Dialect::PostgreSQL, &source.primary_key)
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
