// スキーマドメインモデル
//
// 比較対象となるデータベーススキーマを表現する型システム。
// Schema, Table, Column, ForeignKey を提供します。

use crate::core::config::Dialect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// スキーマ定義
///
/// テーブル名順に並ぶBTreeMapで保持するため、差分の出力順が安定します。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// 取得元のデータベース方言（不明な場合はNone）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,

    /// テーブル定義のマップ（テーブル名 -> Table）
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    /// 新しいスキーマを作成
    pub fn new(dialect: Option<Dialect>) -> Self {
        Self {
            dialect,
            tables: BTreeMap::new(),
        }
    }

    /// テーブルを追加
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// 指定されたテーブルが存在するか確認
    pub fn has_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    /// 指定されたテーブルを取得
    pub fn get_table(&self, table_name: &str) -> Option<&Table> {
        self.tables.get(table_name)
    }

    /// テーブル数を取得
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// テーブル定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// テーブル名
    pub name: String,

    /// カラム定義のリスト（定義順）
    pub columns: Vec<Column>,

    /// プライマリキーのカラム（キー内の順序）
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// 外部キーのリスト
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// 新しいテーブルを作成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// カラムを追加
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// 指定されたカラムを取得
    pub fn get_column(&self, column_name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == column_name)
    }

    /// このテーブルが参照しているテーブル名（自己参照を除く）
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self
            .foreign_keys
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .filter(|name| *name != self.name)
            .collect();
        tables.sort();
        tables.dedup();
        tables
    }
}

/// カラム定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// カラム名
    pub name: String,

    /// 宣言された型（例: INT, NCHAR(10)）
    pub data_type: String,

    /// NULL許可フラグ
    pub nullable: bool,

    /// デフォルト値（SQL式のまま保持）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Column {
    /// 新しいカラムを作成
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
        }
    }

    /// 比較用に正規化した型名
    pub fn normalized_type(&self) -> String {
        normalize_type(&self.data_type)
    }

    /// 比較用に正規化したデフォルト値
    pub fn normalized_default(&self) -> Option<String> {
        normalize_default(self.default_value.as_deref())
    }

    /// 型・NULL許可・デフォルト値が同じかどうか（名前は比較しない）
    pub fn is_equivalent(&self, other: &Column) -> bool {
        self.normalized_type() == other.normalized_type()
            && self.nullable == other.nullable
            && self.normalized_default() == other.normalized_default()
    }
}

/// 外部キー定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// 制約名（SQLiteなど名前を持たない場合はNone）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 参照元カラム
    pub columns: Vec<String>,

    /// 参照先テーブル
    pub referenced_table: String,

    /// 参照先カラム（省略時は参照先のプライマリキー）
    #[serde(default)]
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// 制約名を無視して同じ外部キーかどうか
    pub fn is_equivalent(&self, other: &ForeignKey) -> bool {
        self.columns == other.columns
            && self.referenced_table == other.referenced_table
            && self.referenced_columns == other.referenced_columns
    }

    /// 差分エントリ用の表示名（例: FK(user_id)->users）
    pub fn display_name(&self) -> String {
        format!("FK({})->{}", self.columns.join(","), self.referenced_table)
    }
}

/// 型名を大文字化し、空白を正規化する
fn normalize_type(data_type: &str) -> String {
    data_type
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" (", "(")
        .replace(", ", ",")
        .to_uppercase()
}

fn normalize_default(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_tables_are_ordered_by_name() {
        let mut schema = Schema::new(Some(Dialect::SQLite));
        schema.add_table(Table::new("table2"));
        schema.add_table(Table::new("table1"));

        let names: Vec<&String> = schema.tables.keys().collect();
        assert_eq!(names, vec!["table1", "table2"]);
        assert!(schema.has_table("table1"));
        assert_eq!(schema.table_count(), 2);
    }

    #[test]
    fn test_column_equivalence_ignores_case_and_spacing() {
        let a = Column::new("col1", "varchar  (255)", true);
        let b = Column::new("col1", "VARCHAR(255)", true);
        assert!(a.is_equivalent(&b));

        let c = Column::new("col1", "NCHAR(10)", true);
        assert!(!c.is_equivalent(&Column::new("col1", "NCHAR(10)", false)));
        assert!(!c.is_equivalent(&Column::new("col1", "NCHAR(20)", true)));
    }

    #[test]
    fn test_foreign_key_equivalence_ignores_name() {
        let a = ForeignKey {
            name: Some("orders_user_id_fkey".to_string()),
            columns: vec!["user_id".to_string()],
            referenced_table: "users".to_string(),
            referenced_columns: vec!["id".to_string()],
        };
        let b = ForeignKey { name: None, ..a.clone() };
        assert!(a.is_equivalent(&b));
        assert_eq!(a.display_name(), "FK(user_id)->users");
    }

    #[test]
    fn test_referenced_tables_skips_self_reference() {
        let mut table = Table::new("employees");
        table.foreign_keys.push(ForeignKey {
            name: None,
            columns: vec!["manager_id".to_string()],
            referenced_table: "employees".to_string(),
            referenced_columns: vec!["id".to_string()],
        });
        table.foreign_keys.push(ForeignKey {
            name: None,
            columns: vec!["dept_id".to_string()],
            referenced_table: "departments".to_string(),
            referenced_columns: vec!["id".to_string()],
        });
        assert_eq!(table.referenced_tables(), vec!["departments"]);
    }
}
