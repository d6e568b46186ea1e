// スキーマ差分検出サービス
//
// ソースとターゲットのスキーマ間の差分を検出するサービス。
// テーブル、カラム、プライマリキー、外部キーの追加、削除、変更を検出します。

use crate::core::schema::{Schema, Table};
use crate::core::schema_diff::{ColumnDiff, Difference, TableDiff};

/// スキーマ差分検出サービス
#[derive(Debug, Clone, Default)]
pub struct SchemaDiffDetector {}

impl SchemaDiffDetector {
    /// 新しいSchemaDiffDetectorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// スキーマ差分を検出
    ///
    /// 出力順は安定しています。ソースのみのテーブル（Add）と内容の異なるテーブル（Change）を
    /// ソースのテーブル名順に、続いてターゲットのみのテーブル（Drop）をターゲットのテーブル名順に並べます。
    ///
    /// # Arguments
    ///
    /// * `source` - あるべき姿のスキーマ
    /// * `target` - 現在のスキーマ
    ///
    /// # Returns
    ///
    /// 差分のリスト
    pub fn detect_diff(&self, source: &Schema, target: &Schema) -> Vec<Difference> {
        let mut differences = Vec::new();

        for (table_name, source_table) in &source.tables {
            match target.get_table(table_name) {
                None => differences.push(Difference::table_added(source_table)),
                Some(target_table) => {
                    let table_diff = self.detect_table_diff(target_table, source_table);
                    if !table_diff.is_empty() {
                        differences.push(Difference::table_changed(
                            source_table,
                            target_table,
                            table_diff.to_children(),
                        ));
                    }
                }
            }
        }

        for (table_name, target_table) in &target.tables {
            if !source.has_table(table_name) {
                differences.push(Difference::table_dropped(target_table));
            }
        }

        differences
    }

    /// テーブル差分を検出
    ///
    /// # Arguments
    ///
    /// * `old_table` - 現在（ターゲット側）のテーブル定義
    /// * `new_table` - あるべき（ソース側）のテーブル定義
    pub fn detect_table_diff(&self, old_table: &Table, new_table: &Table) -> TableDiff {
        let mut table_diff = TableDiff::new(new_table.name.clone());

        self.detect_column_diff(old_table, new_table, &mut table_diff);

        if old_table.primary_key != new_table.primary_key {
            table_diff.primary_key_change =
                Some((old_table.primary_key.clone(), new_table.primary_key.clone()));
        }

        self.detect_foreign_key_diff(old_table, new_table, &mut table_diff);

        table_diff
    }

    /// カラム差分を検出（カラム定義順）
    fn detect_column_diff(&self, old_table: &Table, new_table: &Table, table_diff: &mut TableDiff) {
        for new_column in &new_table.columns {
            match old_table.get_column(&new_column.name) {
                None => table_diff.added_columns.push(new_column.clone()),
                Some(old_column) => {
                    if !old_column.is_equivalent(new_column) {
                        table_diff
                            .modified_columns
                            .push(ColumnDiff::new(old_column.clone(), new_column.clone()));
                    }
                }
            }
        }

        for old_column in &old_table.columns {
            if new_table.get_column(&old_column.name).is_none() {
                table_diff.removed_columns.push(old_column.clone());
            }
        }
    }

    /// 外部キー差分を検出（制約名は比較しない）
    fn detect_foreign_key_diff(
        &self,
        old_table: &Table,
        new_table: &Table,
        table_diff: &mut TableDiff,
    ) {
        for new_fk in &new_table.foreign_keys {
            if !old_table.foreign_keys.iter().any(|fk| fk.is_equivalent(new_fk)) {
                table_diff.added_foreign_keys.push(new_fk.clone());
            }
        }

        for old_fk in &old_table.foreign_keys {
            if !new_table.foreign_keys.iter().any(|fk| fk.is_equivalent(old_fk)) {
                table_diff.removed_foreign_keys.push(old_fk.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ForeignKey};
    use crate::core::schema_diff::{ChangeKind, ObjectKind};

    fn table(name: &str, columns: &[(&str, &str)]) -> Table {
        let mut table = Table::new(name);
        for (column, data_type) in columns {
            table.add_column(Column::new(*column, *data_type, true));
        }
        table
    }

    fn schema(tables: Vec<Table>) -> Schema {
        let mut schema = Schema::default();
        for t in tables {
            schema.add_table(t);
        }
        schema
    }

    #[test]
    fn test_added_tables_in_name_order() {
        let source = schema(vec![
            table("table2", &[("col1", "INT")]),
            table("table1", &[("col1", "INT")]),
        ]);
        let target = Schema::default();

        let differences = SchemaDiffDetector::new().detect_diff(&source, &target);

        assert_eq!(differences.len(), 2);
        assert_eq!(differences[0].name(), "table1");
        assert_eq!(differences[1].name(), "table2");
        assert!(differences
            .iter()
            .all(|d| d.change_kind() == ChangeKind::Add && d.kind() == ObjectKind::Table));
    }

    #[test]
    fn test_identical_schemas_have_no_differences() {
        let source = schema(vec![table("table1", &[("col1", "INT")])]);
        let target = schema(vec![table("table1", &[("col1", "int")])]);

        assert!(SchemaDiffDetector::new()
            .detect_diff(&source, &target)
            .is_empty());
    }

    #[test]
    fn test_change_and_drop_ordering() {
        let source = schema(vec![
            table("table1", &[("col1", "INT")]),
            table("table2", &[("col1", "INT")]),
        ]);
        let target = schema(vec![
            table("table2", &[("col1", "INT"), ("col2", "NCHAR(10)")]),
            table("table3", &[("col1", "INT")]),
        ]);

        let differences = SchemaDiffDetector::new().detect_diff(&source, &target);
        let summary: Vec<(&str, ChangeKind)> = differences
            .iter()
            .map(|d| (d.name(), d.change_kind()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("table1", ChangeKind::Add),
                ("table2", ChangeKind::Change),
                ("table3", ChangeKind::Drop),
            ]
        );

        let children = differences[1].children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "table2.col2");
        assert_eq!(children[0].change_kind(), ChangeKind::Drop);
    }

    #[test]
    fn test_detect_primary_key_and_foreign_key_changes() {
        let mut old_table = table("orders", &[("id", "INTEGER"), ("user_id", "INTEGER")]);
        old_table.foreign_keys.push(ForeignKey {
            name: Some("orders_user_id_fkey".to_string()),
            columns: vec!["user_id".to_string()],
            referenced_table: "users".to_string(),
            referenced_columns: vec!["id".to_string()],
        });

        let mut new_table = old_table.clone();
        new_table.primary_key = vec!["id".to_string()];
        // 名前の違いは差分とみなさない
        new_table.foreign_keys[0].name = None;

        let diff = SchemaDiffDetector::new().detect_table_diff(&old_table, &new_table);
        assert!(diff.primary_key_change.is_some());
        assert!(diff.added_foreign_keys.is_empty());
        assert!(diff.removed_foreign_keys.is_empty());
    }
}
