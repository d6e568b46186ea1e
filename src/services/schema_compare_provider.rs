// スキーマ比較プロバイダー
//
// 比較エンジンが利用する外部協調者のインターフェースと、
// テーブル単位で比較する既定の実装（TableSchemaProvider）を提供します。
// エンジンはDifference/識別子の表面だけを扱い、スキーマモデルの内部には立ち入りません。

use crate::adapters::database::DatabaseHandle;
use crate::adapters::database_introspector::introspect_schema;
use crate::adapters::sql_generator::create_generator;
use crate::core::config::Dialect;
use crate::core::error::CompareError;
use crate::core::schema::{Schema, Table};
use crate::core::schema_diff::{
    sort_tables_for_creation, sort_tables_for_removal, ChangeKind, ComparisonResult, Difference,
    ObjectIdentity,
};
use crate::services::schema_diff_detector::SchemaDiffDetector;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

/// 包含/除外に分けた差分の集合
#[derive(Debug, Clone, Default)]
pub struct DeploymentSelection<'a> {
    pub included: Vec<&'a Difference>,
    pub excluded: Vec<&'a Difference>,
}

impl<'a> DeploymentSelection<'a> {
    /// 比較結果の現在の包含フラグから作成
    pub fn from_result(result: &'a ComparisonResult) -> Self {
        Self {
            included: result.included_differences(),
            excluded: result.excluded_differences(),
        }
    }

    /// すべての差分を包含する選択
    pub fn all(differences: &'a [Difference]) -> Self {
        Self {
            included: differences.iter().collect(),
            excluded: Vec::new(),
        }
    }
}

/// 1つの差分を適用するためのSQL文
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentStep {
    pub object: ObjectIdentity,
    pub change_kind: ChangeKind,
    pub statements: Vec<String>,
}

impl DeploymentStep {
    /// スクリプト上の見出し（例: `-- Add Table table1`）
    pub fn heading(&self) -> String {
        format!("-- {} {}", self.change_kind, self.object)
    }
}

/// スキーマ比較プロバイダー
#[async_trait]
pub trait SchemaCompareProvider: Send + Sync {
    /// ライブデータベースからスキーマモデルを読み込む
    async fn read_model(&self, database: &DatabaseHandle) -> Result<Schema, CompareError>;

    /// 2つのモデル間の差分を安定した順序で返す
    fn diff(&self, source: &Schema, target: &Schema) -> Result<Vec<Difference>, CompareError>;

    /// 包含された差分を適用順に並べる
    ///
    /// 除外によって依存関係を満たせなくなった場合はGenerationError。
    fn plan<'a>(
        &self,
        selection: &DeploymentSelection<'a>,
    ) -> Result<Vec<&'a Difference>, CompareError>;

    /// 包含された差分を方言別のSQLに変換する
    fn render(
        &self,
        selection: &DeploymentSelection<'_>,
        dialect: Dialect,
    ) -> Result<Vec<DeploymentStep>, CompareError>;

    /// 1つの差分をターゲットに適用する
    async fn apply(
        &self,
        step: &DeploymentStep,
        database: &DatabaseHandle,
    ) -> Result<(), CompareError>;
}

/// テーブル単位の既定プロバイダー
#[derive(Debug, Clone, Default)]
pub struct TableSchemaProvider {
    detector: SchemaDiffDetector,
}

impl TableSchemaProvider {
    pub fn new() -> Self {
        Self {
            detector: SchemaDiffDetector::new(),
        }
    }

    /// 包含されたAdd/Changeが、除外されたAddのテーブルを参照していないか検証
    fn validate_dependencies(&self, selection: &DeploymentSelection<'_>) -> Result<(), CompareError> {
        let excluded_adds: HashSet<&str> = selection
            .excluded
            .iter()
            .filter(|d| d.change_kind() == ChangeKind::Add)
            .map(|d| d.name())
            .collect();

        if excluded_adds.is_empty() {
            return Ok(());
        }

        for difference in &selection.included {
            if let Some(table) = difference.source_definition() {
                if let Some(missing) = table
                    .referenced_tables()
                    .into_iter()
                    .find(|name| excluded_adds.contains(name))
                {
                    return Err(CompareError::generation(format!(
                        "Table '{}' references '{}', whose creation is excluded",
                        table.name, missing
                    )));
                }
            }
        }

        Ok(())
    }
}

fn definition<'a>(
    table: Option<&'a Table>,
    difference: &Difference,
) -> Result<&'a Table, CompareError> {
    table.ok_or_else(|| {
        CompareError::generation(format!(
            "No table definition available for {}",
            difference.identity()
        ))
    })
}

#[async_trait]
impl SchemaCompareProvider for TableSchemaProvider {
    async fn read_model(&self, database: &DatabaseHandle) -> Result<Schema, CompareError> {
        introspect_schema(database.dialect, &database.pool)
            .await
            .map_err(|e| {
                CompareError::provider(format!(
                    "Failed to read schema of '{}': {:#}",
                    database.database_name, e
                ))
            })
    }

    fn diff(&self, source: &Schema, target: &Schema) -> Result<Vec<Difference>, CompareError> {
        Ok(self.detector.detect_diff(source, target))
    }

    fn plan<'a>(
        &self,
        selection: &DeploymentSelection<'a>,
    ) -> Result<Vec<&'a Difference>, CompareError> {
        self.validate_dependencies(selection)?;

        let mut drops = Vec::new();
        let mut changes = Vec::new();
        let mut adds = Vec::new();
        for difference in &selection.included {
            match difference.change_kind() {
                ChangeKind::Drop => drops.push(*difference),
                ChangeKind::Change => changes.push(*difference),
                ChangeKind::Add => adds.push(*difference),
            }
        }

        let drop_tables = drops
            .iter()
            .map(|d| definition(d.target_definition(), d))
            .collect::<Result<Vec<_>, _>>()?;
        let add_tables = adds
            .iter()
            .map(|d| definition(d.source_definition(), d))
            .collect::<Result<Vec<_>, _>>()?;
        let sorted_adds = sort_tables_for_creation(&add_tables).map_err(CompareError::generation)?;
        let sorted_drops = sort_tables_for_removal(&drop_tables);

        let by_name = |list: &[&'a Difference], name: &str| -> Option<&'a Difference> {
            list.iter().copied().find(|d| d.name() == name)
        };

        let mut planned = Vec::with_capacity(selection.included.len());
        planned.extend(sorted_drops.iter().filter_map(|t| by_name(&drops, &t.name)));
        planned.extend(changes.iter().copied());
        planned.extend(sorted_adds.iter().filter_map(|t| by_name(&adds, &t.name)));

        Ok(planned)
    }

    fn render(
        &self,
        selection: &DeploymentSelection<'_>,
        dialect: Dialect,
    ) -> Result<Vec<DeploymentStep>, CompareError> {
        let generator = create_generator(dialect);
        let planned = self.plan(selection)?;

        let mut steps = Vec::with_capacity(planned.len());
        for difference in planned {
            let statements = match difference.change_kind() {
                ChangeKind::Add => {
                    let table = definition(difference.source_definition(), difference)?;
                    vec![generator.generate_create_table(table)]
                }
                ChangeKind::Drop => vec![generator.generate_drop_table(difference.name())],
                ChangeKind::Change => {
                    let source = definition(difference.source_definition(), difference)?;
                    let target = definition(difference.target_definition(), difference)?;
                    let table_diff = self.detector.detect_table_diff(target, source);
                    generator.generate_alter_table(source, target, &table_diff)?
                }
            };

            steps.push(DeploymentStep {
                object: difference.identity().clone(),
                change_kind: difference.change_kind(),
                statements,
            });
        }

        debug!(steps = steps.len(), dialect = %dialect, "Rendered deployment steps");
        Ok(steps)
    }

    async fn apply(
        &self,
        step: &DeploymentStep,
        database: &DatabaseHandle,
    ) -> Result<(), CompareError> {
        database
            .execute_in_transaction(&step.statements)
            .await
            .map_err(|e| {
                CompareError::provider(format!(
                    "Failed to apply {} {}: {}",
                    step.change_kind, step.object, e
                ))
            })
    }
}
