// スキーマパッケージ
//
// データベースのスキーマ（およびデータ）のスナップショットを表現します。
// スキーマのみのパッケージ（dacpac相当）と、データを含むパッケージ（bacpac相当）があります。

use crate::core::config::Dialect;
use crate::core::naming::PACKAGE_FORMAT_VERSION;
use crate::core::schema::Schema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// パッケージの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    /// スキーマのみ
    Schema,
    /// スキーマ + 全テーブルの行データ
    Full,
}

/// テーブルの行データ
///
/// 値は方言間で持ち運べるよう文字列表現で保持します（NULLはNone）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableData {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// スキーマパッケージ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaPackage {
    /// フォーマットバージョン
    pub format_version: String,

    /// パッケージの種類
    pub kind: PackageKind,

    /// アプリケーション名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,

    /// アプリケーションバージョン
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_version: Option<String>,

    /// 取得元のデータベース方言
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,

    /// 作成日時（UTC）
    pub created_at: DateTime<Utc>,

    /// スキーマ部分のSHA-256チェックサム
    pub checksum: String,

    /// スキーマ定義
    pub schema: Schema,

    /// 行データ（Fullパッケージのみ）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, TableData>,
}

impl SchemaPackage {
    /// スキーマのみのパッケージを作成
    pub fn schema_only(schema: Schema) -> Self {
        Self::build(PackageKind::Schema, schema, BTreeMap::new())
    }

    /// データを含むパッケージを作成
    pub fn full(schema: Schema, data: BTreeMap<String, TableData>) -> Self {
        Self::build(PackageKind::Full, schema, data)
    }

    fn build(kind: PackageKind, schema: Schema, data: BTreeMap<String, TableData>) -> Self {
        let checksum = compute_checksum(&schema);
        Self {
            format_version: PACKAGE_FORMAT_VERSION.to_string(),
            kind,
            application_name: None,
            application_version: None,
            dialect: schema.dialect,
            created_at: Utc::now(),
            checksum,
            schema,
            data,
        }
    }

    /// アプリケーション名とバージョンを設定
    pub fn with_application(
        mut self,
        name: Option<String>,
        version: Option<String>,
    ) -> Self {
        self.application_name = name;
        self.application_version = version;
        self
    }

    pub fn is_full(&self) -> bool {
        self.kind == PackageKind::Full
    }

    /// 保存されたチェックサムがスキーマと一致するか
    pub fn verify_checksum(&self) -> bool {
        self.checksum == compute_checksum(&self.schema)
    }

    /// 全テーブルの行数合計
    pub fn total_rows(&self) -> usize {
        self.data.values().map(TableData::row_count).sum()
    }
}

/// スキーマのJSON表現からSHA-256チェックサムを計算
///
/// BTreeMapで保持しているためJSON表現は決定的です。
pub fn compute_checksum(schema: &Schema) -> String {
    let canonical = serde_json::to_string(schema).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, Table};

    fn sample_schema() -> Schema {
        let mut schema = Schema::new(Some(Dialect::SQLite));
        let mut table = Table::new("table1");
        table.add_column(Column::new("id", "INTEGER", false));
        table.primary_key = vec!["id".to_string()];
        schema.add_table(table);
        schema
    }

    #[test]
    fn test_schema_only_package() {
        let package = SchemaPackage::schema_only(sample_schema())
            .with_application(Some("app".to_string()), Some("1.2.3".to_string()));

        assert!(!package.is_full());
        assert_eq!(package.format_version, "1.0");
        assert_eq!(package.dialect, Some(Dialect::SQLite));
        assert_eq!(package.application_version.as_deref(), Some("1.2.3"));
        assert!(package.verify_checksum());
    }

    #[test]
    fn test_checksum_detects_tampering() {
        let mut package = SchemaPackage::schema_only(sample_schema());
        package.schema.add_table(Table::new("injected"));
        assert!(!package.verify_checksum());
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(compute_checksum(&sample_schema()), compute_checksum(&sample_schema()));
        assert_eq!(compute_checksum(&sample_schema()).len(), 64);
    }

    #[test]
    fn test_full_package_counts_rows() {
        let mut data = BTreeMap::new();
        data.insert(
            "table1".to_string(),
            TableData {
                columns: vec!["id".to_string()],
                rows: vec![vec![Some("1".to_string())], vec![Some("2".to_string())]],
            },
        );
        let package = SchemaPackage::full(sample_schema(), data);
        assert!(package.is_full());
        assert_eq!(package.total_rows(), 2);
    }
}
