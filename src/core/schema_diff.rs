// スキーマ差分ドメインモデル
//
// ソースとターゲットのスキーマ間で検出された差分（Difference）と、
// 外部から識別子で参照できる射影（DiffEntry）を表現します。

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::core::config::Dialect;
use crate::core::endpoint::EndpointDescriptor;
use crate::core::schema::{Column, ForeignKey, Table};

/// 差分対象のオブジェクト種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Table,
    Column,
    PrimaryKey,
    ForeignKey,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Table => write!(f, "Table"),
            ObjectKind::Column => write!(f, "Column"),
            ObjectKind::PrimaryKey => write!(f, "PrimaryKey"),
            ObjectKind::ForeignKey => write!(f, "ForeignKey"),
        }
    }
}

/// 変更種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// ソースにのみ存在（ターゲットへ追加）
    Add,
    /// ターゲットにのみ存在（ターゲットから削除）
    Drop,
    /// 両方に存在し内容が異なる
    Change,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "Add"),
            ChangeKind::Drop => write!(f, "Drop"),
            ChangeKind::Change => write!(f, "Change"),
        }
    }
}

/// オブジェクトの識別子（修飾名 + 種別）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectIdentity {
    /// 修飾名（テーブルは `table1`、カラムは `table1.col1`）
    pub name: String,
    /// 種別
    pub kind: ObjectKind,
}

impl ObjectIdentity {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Table)
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// 検出された1件の差分
///
/// ソース側またはターゲット側の少なくとも一方の識別子を必ず持ちます。
/// 複合オブジェクト（テーブル）の変更は子の差分（カラムなど）を内包し、
/// 包含フラグは親の単位で扱われます。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    source_object: Option<ObjectIdentity>,
    target_object: Option<ObjectIdentity>,
    change_kind: ChangeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Difference>,
    /// プロバイダーがスクリプト生成に使うソース側の定義
    #[serde(skip_serializing_if = "Option::is_none")]
    source_definition: Option<Table>,
    /// プロバイダーがスクリプト生成に使うターゲット側の定義
    #[serde(skip_serializing_if = "Option::is_none")]
    target_definition: Option<Table>,
}

impl Difference {
    /// ソースにのみ存在するテーブル
    pub fn table_added(table: &Table) -> Self {
        Self {
            source_object: Some(ObjectIdentity::table(&table.name)),
            target_object: None,
            change_kind: ChangeKind::Add,
            children: Vec::new(),
            source_definition: Some(table.clone()),
            target_definition: None,
        }
    }

    /// ターゲットにのみ存在するテーブル
    pub fn table_dropped(table: &Table) -> Self {
        Self {
            source_object: None,
            target_object: Some(ObjectIdentity::table(&table.name)),
            change_kind: ChangeKind::Drop,
            children: Vec::new(),
            source_definition: None,
            target_definition: Some(table.clone()),
        }
    }

    /// 両方に存在し内容が異なるテーブル
    pub fn table_changed(source: &Table, target: &Table, children: Vec<Difference>) -> Self {
        Self {
            source_object: Some(ObjectIdentity::table(&source.name)),
            target_object: Some(ObjectIdentity::table(&target.name)),
            change_kind: ChangeKind::Change,
            children,
            source_definition: Some(source.clone()),
            target_definition: Some(target.clone()),
        }
    }

    /// 子オブジェクト（カラム、キーなど）の差分
    pub fn child(identity: ObjectIdentity, change_kind: ChangeKind) -> Self {
        let (source_object, target_object) = match change_kind {
            ChangeKind::Add => (Some(identity), None),
            ChangeKind::Drop => (None, Some(identity)),
            ChangeKind::Change => (Some(identity.clone()), Some(identity)),
        };
        Self {
            source_object,
            target_object,
            change_kind,
            children: Vec::new(),
            source_definition: None,
            target_definition: None,
        }
    }

    pub fn source_object(&self) -> Option<&ObjectIdentity> {
        self.source_object.as_ref()
    }

    pub fn target_object(&self) -> Option<&ObjectIdentity> {
        self.target_object.as_ref()
    }

    pub fn change_kind(&self) -> ChangeKind {
        self.change_kind
    }

    pub fn children(&self) -> &[Difference] {
        &self.children
    }

    pub fn source_definition(&self) -> Option<&Table> {
        self.source_definition.as_ref()
    }

    pub fn target_definition(&self) -> Option<&Table> {
        self.target_definition.as_ref()
    }

    /// 差分の識別子（ソース側を優先）
    pub fn identity(&self) -> &ObjectIdentity {
        match (&self.source_object, &self.target_object) {
            (Some(identity), _) | (None, Some(identity)) => identity,
            // 公開コンストラクタは必ずどちらかを設定する
            (None, None) => unreachable!("difference without object identity"),
        }
    }

    pub fn name(&self) -> &str {
        &self.identity().name
    }

    pub fn kind(&self) -> ObjectKind {
        self.identity().kind
    }
}

/// 差分エントリ
///
/// Differenceの外部公開用の射影。名前・種別・変更種別の組で元の差分に
/// 突き合わせられるため、シリアライズしてプロセスを跨いでも再利用できます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub name: String,
    pub kind: ObjectKind,
    pub change_kind: ChangeKind,
    pub source_value: Option<String>,
    pub target_value: Option<String>,
    /// 親エントリの名前
    pub parent: Option<String>,
    pub children: Vec<DiffEntry>,
    pub included: bool,
}

impl DiffEntry {
    /// 差分からエントリを作る純粋な写像
    ///
    /// 包含フラグは既定値（true）で作成されます。
    pub fn project(difference: &Difference, parent: Option<&DiffEntry>) -> DiffEntry {
        let mut entry = DiffEntry {
            name: difference.name().to_string(),
            kind: difference.kind(),
            change_kind: difference.change_kind(),
            source_value: difference.source_object().map(|o| o.name.clone()),
            target_value: difference.target_object().map(|o| o.name.clone()),
            parent: parent.map(|p| p.name.clone()),
            children: Vec::new(),
            included: true,
        };

        let children = difference
            .children()
            .iter()
            .map(|child| DiffEntry::project(child, Some(&entry)))
            .collect();
        entry.children = children;
        entry
    }

    /// 識別子（名前 + 種別 + 変更種別）が差分と一致するか
    pub fn matches(&self, difference: &Difference) -> bool {
        self.name == difference.name()
            && self.kind == difference.kind()
            && self.change_kind == difference.change_kind()
    }

    /// 表示用ラベル（例: `Table table1 (Add)`）
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.kind, self.name, self.change_kind)
    }
}

/// 比較結果
///
/// 差分の数と順序は作成時に固定され、以降は包含フラグのみが変化します。
/// 再比較は新しいインスタンスで置き換えるため、包含フラグは引き継がれません。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    source: EndpointDescriptor,
    target: EndpointDescriptor,
    is_valid: bool,
    error_message: Option<String>,
    target_dialect: Option<Dialect>,
    differences: Vec<Difference>,
    included: Vec<bool>,
}

impl ComparisonResult {
    /// 比較が完了した結果を作成（全差分が包含された状態）
    pub fn new(
        source: EndpointDescriptor,
        target: EndpointDescriptor,
        target_dialect: Option<Dialect>,
        differences: Vec<Difference>,
    ) -> Self {
        let included = vec![true; differences.len()];
        Self {
            source,
            target,
            is_valid: true,
            error_message: None,
            target_dialect,
            differences,
            included,
        }
    }

    /// 比較可能なモデルを得られなかった結果を作成
    pub fn invalid(
        source: EndpointDescriptor,
        target: EndpointDescriptor,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            is_valid: false,
            error_message: Some(message.into()),
            target_dialect: None,
            differences: Vec::new(),
            included: Vec::new(),
        }
    }

    pub fn source(&self) -> &EndpointDescriptor {
        &self.source
    }

    pub fn target(&self) -> &EndpointDescriptor {
        &self.target
    }

    /// 比較が致命的なエラーなく完了したか
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// 差分がないか（無効な結果は等しいとみなさない）
    pub fn is_equal(&self) -> bool {
        self.is_valid && self.differences.is_empty()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// ターゲット側のデータベース方言
    pub fn target_dialect(&self) -> Option<Dialect> {
        self.target_dialect
    }

    pub fn differences(&self) -> &[Difference] {
        &self.differences
    }

    pub fn len(&self) -> usize {
        self.differences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    /// 各差分の包含フラグ（差分と同じ順序）
    pub fn inclusion_flags(&self) -> &[bool] {
        &self.included
    }

    pub fn is_included(&self, index: usize) -> bool {
        self.included.get(index).copied().unwrap_or(false)
    }

    pub fn included_count(&self) -> usize {
        self.included.iter().filter(|flag| **flag).count()
    }

    /// 包含されている差分（元の順序）
    pub fn included_differences(&self) -> Vec<&Difference> {
        self.differences
            .iter()
            .zip(&self.included)
            .filter(|(_, included)| **included)
            .map(|(difference, _)| difference)
            .collect()
    }

    /// 除外されている差分（元の順序）
    pub fn excluded_differences(&self) -> Vec<&Difference> {
        self.differences
            .iter()
            .zip(&self.included)
            .filter(|(_, included)| !**included)
            .map(|(difference, _)| difference)
            .collect()
    }

    /// 現在の包含フラグを反映したエントリ一覧
    ///
    /// 子エントリは親の包含フラグを引き継ぎます。
    pub fn entries(&self) -> Vec<DiffEntry> {
        self.differences
            .iter()
            .zip(&self.included)
            .map(|(difference, included)| {
                let mut entry = DiffEntry::project(difference, None);
                set_included_recursive(&mut entry, *included);
                entry
            })
            .collect()
    }

    /// エントリに対応する差分の位置を検索
    ///
    /// 子エントリを指定した場合は、その子を内包する最上位の差分を返します。
    pub fn find(&self, entry: &DiffEntry) -> Option<usize> {
        self.differences
            .iter()
            .position(|difference| entry.matches(difference))
            .or_else(|| {
                self.differences
                    .iter()
                    .position(|difference| contains_child(difference, entry))
            })
    }

    /// 指定位置の包含フラグを設定（範囲外は無視してfalseを返す）
    pub fn set_included(&mut self, index: usize, included: bool) -> bool {
        match self.included.get_mut(index) {
            Some(flag) => {
                *flag = included;
                true
            }
            None => false,
        }
    }
}

fn contains_child(difference: &Difference, entry: &DiffEntry) -> bool {
    difference
        .children()
        .iter()
        .any(|child| entry.matches(child) || contains_child(child, entry))
}

fn set_included_recursive(entry: &mut DiffEntry, included: bool) {
    entry.included = included;
    for child in &mut entry.children {
        set_included_recursive(child, included);
    }
}

/// テーブル差分
///
/// ターゲット（現状）をソース（あるべき姿）に合わせるための変更内容。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDiff {
    /// テーブル名
    pub table_name: String,

    /// 追加するカラム
    pub added_columns: Vec<Column>,

    /// 削除するカラム
    pub removed_columns: Vec<Column>,

    /// 変更するカラム
    pub modified_columns: Vec<ColumnDiff>,

    /// プライマリキーの変更（変更前, 変更後）
    pub primary_key_change: Option<(Vec<String>, Vec<String>)>,

    /// 追加する外部キー
    pub added_foreign_keys: Vec<ForeignKey>,

    /// 削除する外部キー
    pub removed_foreign_keys: Vec<ForeignKey>,
}

impl TableDiff {
    /// 新しいテーブル差分を作成
    pub fn new(table_name: String) -> Self {
        Self {
            table_name,
            added_columns: Vec::new(),
            removed_columns: Vec::new(),
            modified_columns: Vec::new(),
            primary_key_change: None,
            added_foreign_keys: Vec::new(),
            removed_foreign_keys: Vec::new(),
        }
    }

    /// 差分が空かどうか
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.primary_key_change.is_none()
            && self.added_foreign_keys.is_empty()
            && self.removed_foreign_keys.is_empty()
    }

    /// 子の差分に変換
    pub fn to_children(&self) -> Vec<Difference> {
        let column_identity =
            |name: &str| ObjectIdentity::new(format!("{}.{}", self.table_name, name), ObjectKind::Column);
        let fk_identity = |fk: &ForeignKey| {
            ObjectIdentity::new(
                format!("{}.{}", self.table_name, fk.display_name()),
                ObjectKind::ForeignKey,
            )
        };

        let mut children = Vec::new();
        for column in &self.added_columns {
            children.push(Difference::child(column_identity(&column.name), ChangeKind::Add));
        }
        for column in &self.removed_columns {
            children.push(Difference::child(column_identity(&column.name), ChangeKind::Drop));
        }
        for column_diff in &self.modified_columns {
            children.push(Difference::child(
                column_identity(&column_diff.column_name),
                ChangeKind::Change,
            ));
        }
        if self.primary_key_change.is_some() {
            children.push(Difference::child(
                ObjectIdentity::new(format!("{}.PK", self.table_name), ObjectKind::PrimaryKey),
                ChangeKind::Change,
            ));
        }
        for fk in &self.added_foreign_keys {
            children.push(Difference::child(fk_identity(fk), ChangeKind::Add));
        }
        for fk in &self.removed_foreign_keys {
            children.push(Difference::child(fk_identity(fk), ChangeKind::Drop));
        }
        children
    }
}

/// カラム差分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDiff {
    /// カラム名
    pub column_name: String,

    /// 変更前（ターゲット側）のカラム定義
    pub old_column: Column,

    /// 変更後（ソース側）のカラム定義
    pub new_column: Column,

    /// 変更された属性
    pub changes: Vec<ColumnChange>,
}

impl ColumnDiff {
    /// 新しいカラム差分を作成
    pub fn new(old_column: Column, new_column: Column) -> Self {
        let mut changes = Vec::new();

        if old_column.normalized_type() != new_column.normalized_type() {
            changes.push(ColumnChange::TypeChanged {
                old_type: old_column.data_type.clone(),
                new_type: new_column.data_type.clone(),
            });
        }

        if old_column.nullable != new_column.nullable {
            changes.push(ColumnChange::NullableChanged {
                old_nullable: old_column.nullable,
                new_nullable: new_column.nullable,
            });
        }

        if old_column.normalized_default() != new_column.normalized_default() {
            changes.push(ColumnChange::DefaultValueChanged {
                old_default: old_column.default_value.clone(),
                new_default: new_column.default_value.clone(),
            });
        }

        Self {
            column_name: new_column.name.clone(),
            old_column,
            new_column,
            changes,
        }
    }
}

/// カラム変更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnChange {
    TypeChanged {
        old_type: String,
        new_type: String,
    },
    NullableChanged {
        old_nullable: bool,
        new_nullable: bool,
    },
    DefaultValueChanged {
        old_default: Option<String>,
        new_default: Option<String>,
    },
}

/// 外部キーの依存関係を考慮して、作成するテーブルをトポロジカルソート
///
/// 被参照テーブルが先に作成されるように並び替えます。
/// 集合外のテーブルへの参照は無視し、循環参照がある場合はエラーを返します。
pub fn sort_tables_for_creation<'a>(tables: &[&'a Table]) -> Result<Vec<&'a Table>, String> {
    if tables.is_empty() {
        return Ok(Vec::new());
    }

    let table_map: HashMap<&str, &'a Table> =
        tables.iter().map(|t| (t.name.as_str(), *t)).collect();
    let names: HashSet<&str> = table_map.keys().copied().collect();

    // テーブル名 -> このテーブルが参照しているテーブル名のリスト
    let dependencies: HashMap<&str, Vec<&str>> = tables
        .iter()
        .map(|table| {
            let deps = table
                .referenced_tables()
                .into_iter()
                .filter(|referenced| names.contains(referenced))
                .collect();
            (table.name.as_str(), deps)
        })
        .collect();

    // Kahnのアルゴリズム（入次数 = 依存先の数）
    let mut in_degree: HashMap<&str, usize> = dependencies
        .iter()
        .map(|(name, deps)| (*name, deps.len()))
        .collect();

    let mut queue: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&name, _)| name)
        .collect();
    // popで名前順に取り出すため降順に並べる
    queue.sort_by(|a, b| b.cmp(a));

    let mut sorted: Vec<&'a Table> = Vec::new();

    while let Some(table_name) = queue.pop() {
        if let Some(table) = table_map.get(table_name) {
            sorted.push(*table);
        }

        let mut released = Vec::new();
        for (other_table, deps) in &dependencies {
            if deps.contains(&table_name) {
                if let Some(degree) = in_degree.get_mut(other_table) {
                    *degree -= 1;
                    if *degree == 0 {
                        released.push(*other_table);
                    }
                }
            }
        }
        if !released.is_empty() {
            queue.extend(released);
            queue.sort_by(|a, b| b.cmp(a));
        }
    }

    if sorted.len() != tables.len() {
        let mut remaining: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree > 0)
            .map(|(&name, _)| name)
            .collect();
        remaining.sort();
        return Err(format!(
            "Circular reference detected. The following tables have circular references: {:?}",
            remaining
        ));
    }

    Ok(sorted)
}

/// 外部キーの依存関係を考慮して、削除するテーブルを並び替え
///
/// 参照元テーブルが先に削除されるように、作成順の逆順にします。
/// 循環参照がある場合は名前順にフォールバックします（削除は外部キー検査を無効化して行う前提）。
pub fn sort_tables_for_removal<'a>(tables: &[&'a Table]) -> Vec<&'a Table> {
    match sort_tables_for_creation(tables) {
        Ok(mut sorted) => {
            sorted.reverse();
            sorted
        }
        Err(_) => {
            let mut sorted = tables.to_vec();
            sorted.sort_by(|a, b| a.name.cmp(&b.name));
            sorted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_fk(name: &str, referenced: &[&str]) -> Table {
        let mut table = Table::new(name);
        table.add_column(Column::new("id", "INTEGER", false));
        table.primary_key = vec!["id".to_string()];
        for r in referenced {
            table.foreign_keys.push(ForeignKey {
                name: None,
                columns: vec![format!("{}_id", r)],
                referenced_table: r.to_string(),
                referenced_columns: vec!["id".to_string()],
            });
        }
        table
    }

    #[test]
    fn test_project_table_added() {
        let diff = Difference::table_added(&Table::new("table1"));
        let entry = DiffEntry::project(&diff, None);

        assert_eq!(entry.name, "table1");
        assert_eq!(entry.kind, ObjectKind::Table);
        assert_eq!(entry.change_kind, ChangeKind::Add);
        assert_eq!(entry.source_value.as_deref(), Some("table1"));
        assert!(entry.target_value.is_none());
        assert!(entry.included);
        assert!(entry.matches(&diff));
    }

    #[test]
    fn test_project_carries_children_with_parent() {
        let mut table_diff = TableDiff::new("table2".to_string());
        table_diff.removed_columns.push(Column::new("col2", "NCHAR(10)", true));
        let source = Table::new("table2");
        let target = Table::new("table2");
        let diff = Difference::table_changed(&source, &target, table_diff.to_children());

        let entry = DiffEntry::project(&diff, None);
        assert_eq!(entry.children.len(), 1);
        let child = &entry.children[0];
        assert_eq!(child.name, "table2.col2");
        assert_eq!(child.kind, ObjectKind::Column);
        assert_eq!(child.change_kind, ChangeKind::Drop);
        assert_eq!(child.parent.as_deref(), Some("table2"));
    }

    #[test]
    fn test_entry_does_not_match_other_change_kind() {
        let added = Difference::table_added(&Table::new("table1"));
        let dropped = Difference::table_dropped(&Table::new("table1"));
        let entry = DiffEntry::project(&added, None);

        assert!(entry.matches(&added));
        assert!(!entry.matches(&dropped));
    }

    #[test]
    fn test_entry_survives_serialization() {
        let diff = Difference::table_dropped(&Table::new("table3"));
        let entry = DiffEntry::project(&diff, None);

        let json = serde_json::to_string(&entry).unwrap();
        let restored: DiffEntry = serde_json::from_str(&json).unwrap();
        assert!(restored.matches(&diff));
        assert_eq!(restored.label(), "Table table3 (Drop)");
    }

    fn sample_result() -> ComparisonResult {
        let mut table_diff = TableDiff::new("table2".to_string());
        table_diff.added_columns.push(Column::new("col3", "INT", true));
        let changed = Difference::table_changed(
            &Table::new("table2"),
            &Table::new("table2"),
            table_diff.to_children(),
        );
        ComparisonResult::new(
            EndpointDescriptor::package("src.dacpac"),
            EndpointDescriptor::package("dst.dacpac"),
            Some(Dialect::SQLite),
            vec![Difference::table_added(&Table::new("table1")), changed],
        )
    }

    #[test]
    fn test_new_result_includes_everything() {
        let result = sample_result();
        assert!(result.is_valid());
        assert!(!result.is_equal());
        assert_eq!(result.len(), 2);
        assert_eq!(result.included_count(), 2);
        assert!(result.entries().iter().all(|e| e.included));
    }

    #[test]
    fn test_invalid_result_is_not_equal() {
        let result = ComparisonResult::invalid(
            EndpointDescriptor::package("missing.dacpac"),
            EndpointDescriptor::package("dst.dacpac"),
            "not found",
        );
        assert!(!result.is_valid());
        assert!(!result.is_equal());
        assert_eq!(result.error_message(), Some("not found"));
    }

    #[test]
    fn test_find_child_entry_maps_to_parent() {
        let result = sample_result();
        let entries = result.entries();
        let child = &entries[1].children[0];
        assert_eq!(child.name, "table2.col3");
        assert_eq!(result.find(child), Some(1));
        assert_eq!(result.find(&entries[0]), Some(0));
    }

    #[test]
    fn test_excluded_differences_follow_flags() {
        let mut result = sample_result();
        assert!(result.set_included(0, false));
        assert!(!result.set_included(5, false));

        let excluded = result.excluded_differences();
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].name(), "table1");
        assert_eq!(result.included_differences()[0].name(), "table2");
        assert!(!result.entries()[0].included);
    }

    #[test]
    fn test_column_diff_detects_changes() {
        let old = Column::new("col1", "INT", true);
        let mut new = Column::new("col1", "BIGINT", false);
        new.default_value = Some("0".to_string());

        let diff = ColumnDiff::new(old, new);
        assert_eq!(diff.changes.len(), 3);
        assert!(matches!(diff.changes[0], ColumnChange::TypeChanged { .. }));
    }

    #[test]
    fn test_sort_tables_for_creation_respects_dependencies() {
        let users = table_with_fk("users", &[]);
        let orders = table_with_fk("orders", &["users"]);
        let items = table_with_fk("items", &["orders", "users"]);

        let sorted = sort_tables_for_creation(&[&items, &orders, &users]).unwrap();
        let names: Vec<&str> = sorted.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "orders", "items"]);
    }

    #[test]
    fn test_sort_tables_for_creation_is_name_ordered_without_dependencies() {
        let a = table_with_fk("table2", &[]);
        let b = table_with_fk("table1", &[]);

        let sorted = sort_tables_for_creation(&[&a, &b]).unwrap();
        let names: Vec<&str> = sorted.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["table1", "table2"]);
    }

    #[test]
    fn test_sort_tables_for_creation_detects_cycle() {
        let a = table_with_fk("a", &["b"]);
        let b = table_with_fk("b", &["a"]);

        let err = sort_tables_for_creation(&[&a, &b]).unwrap_err();
        assert!(err.contains("Circular reference"));
    }

    #[test]
    fn test_sort_tables_for_removal_drops_dependents_first() {
        let users = table_with_fk("users", &[]);
        let orders = table_with_fk("orders", &["users"]);

        let sorted = sort_tables_for_removal(&[&users, &orders]);
        let names: Vec<&str> = sorted.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "users"]);
    }
}
