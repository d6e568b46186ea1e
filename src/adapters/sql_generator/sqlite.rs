// SQLite用SQLジェネレーター
//
// SQLiteはALTER TABLEの機能が制限されているため、テーブル変更は
// 新しい定義で一時テーブルを作成し、共通カラムをコピーして置き換える方式で行います。

use crate::adapters::sql_generator::SqlGenerator;
use crate::adapters::sql_quote::quote_columns;
use crate::core::config::Dialect;
use crate::core::error::CompareError;
use crate::core::schema::Table;
use crate::core::schema_diff::TableDiff;

/// 再作成時の一時テーブル名の接頭辞
const REBUILD_TABLE_PREFIX: &str = "_schemacompare_new_";

/// SQLite用SQLジェネレーター
#[derive(Debug, Clone, Default)]
pub struct SqliteSqlGenerator {}

impl SqliteSqlGenerator {
    /// 新しいSqliteSqlGeneratorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// テーブル再作成のSQL文を生成
    ///
    /// # Arguments
    ///
    /// * `source` - 新しいテーブル定義
    /// * `target` - 現在のテーブル定義（コピーするカラムの判定に使用）
    ///
    /// # Returns
    ///
    /// 一時テーブル作成、データコピー、旧テーブル削除、リネームの4文
    pub fn generate_table_rebuild(&self, source: &Table, target: &Table) -> Vec<String> {
        let temp_name = format!("{}{}", REBUILD_TABLE_PREFIX, source.name);
        let mut temp_table = source.clone();
        temp_table.name = temp_name.clone();

        let shared_columns: Vec<String> = source
            .columns
            .iter()
            .filter(|column| target.get_column(&column.name).is_some())
            .map(|column| column.name.clone())
            .collect();

        let mut statements = vec![self.generate_create_table(&temp_table)];
        if !shared_columns.is_empty() {
            let columns = quote_columns(Dialect::SQLite, &shared_columns);
            statements.push(format!(
                "INSERT INTO {} ({}) SELECT {} FROM {};",
                self.quote(&temp_name),
                columns,
                columns,
                self.quote(&target.name)
            ));
        }
        statements.push(self.generate_drop_table(&target.name));
        statements.push(format!(
            "ALTER TABLE {} RENAME TO {};",
            self.quote(&temp_name),
            self.quote(&source.name)
        ));
        statements
    }
}

impl SqlGenerator for SqliteSqlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::SQLite
    }

    /// SQLiteのデータベースはファイルのため、作成はコメントとして出力
    fn generate_create_database(&self, database_name: &str) -> String {
        format!("-- SQLite database file: {}", database_name)
    }

    fn generate_alter_table(
        &self,
        source: &Table,
        target: &Table,
        _diff: &TableDiff,
    ) -> Result<Vec<String>, CompareError> {
        Ok(self.generate_table_rebuild(source, target))
    }
}
