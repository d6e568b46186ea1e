// パッケージ操作
//
// エクスポート、抽出、インポート、配置、配置スクリプト生成、配置計画の各操作を
// LongRunningOperation として提供します。Scriptモードでは外部状態を変更しません。

use crate::adapters::database::DatabaseHandle;
use crate::adapters::database_introspector::read_schema_data;
use crate::adapters::sql_generator::create_generator;
use crate::core::config::Dialect;
use crate::core::endpoint::EndpointDescriptor;
use crate::core::error::{CompareError, OperationError};
use crate::core::operation::CancellationToken;
use crate::core::package::{PackageKind, SchemaPackage, TableData};
use crate::core::schema::Schema;
use crate::core::schema_diff::{ChangeKind, ComparisonResult};
use crate::services::operation_runner::LongRunningOperation;
use crate::services::schema_compare::SchemaCompareService;
use crate::services::schema_compare_provider::DeploymentStep;
use crate::services::script_generation::{format_script, ScriptGenerationService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 名前付き接続上のデータベース
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseTarget {
    pub connection: String,
    pub database_name: String,
}

impl DatabaseTarget {
    pub fn new(connection: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            database_name: database_name.into(),
        }
    }

    pub fn endpoint(&self) -> EndpointDescriptor {
        EndpointDescriptor::database(self.connection.clone(), self.database_name.clone())
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection, self.database_name)
    }
}

/// エクスポート/抽出の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub path: PathBuf,
    pub kind: PackageKind,
    pub table_count: usize,
    pub row_count: usize,
    /// ファイルを書き込んだか（Scriptモードではfalse）
    pub written: bool,
}

/// インポート/配置の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub database_name: String,
    pub script: String,
    /// ターゲットに適用したか（Scriptモードではfalse）
    pub applied: bool,
    pub object_count: usize,
    pub row_count: usize,
}

/// 配置計画のアクション種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployActionKind {
    Create,
    Drop,
    Alter,
}

impl From<ChangeKind> for DeployActionKind {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Add => DeployActionKind::Create,
            ChangeKind::Drop => DeployActionKind::Drop,
            ChangeKind::Change => DeployActionKind::Alter,
        }
    }
}

impl fmt::Display for DeployActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployActionKind::Create => write!(f, "Create"),
            DeployActionKind::Drop => write!(f, "Drop"),
            DeployActionKind::Alter => write!(f, "Alter"),
        }
    }
}

/// 配置計画の1アクション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployAction {
    pub action: DeployActionKind,
    pub object: String,
    /// 子オブジェクトの変更（例: `Add Column table2.col2`）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// 配置計画
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployPlan {
    pub source: String,
    pub target: String,
    pub actions: Vec<DeployAction>,
}

impl DeployPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// 指定した種別のアクション数
    pub fn count(&self, action: DeployActionKind) -> usize {
        self.actions.iter().filter(|a| a.action == action).count()
    }
}

// =============================================================================
// エクスポート / 抽出
// =============================================================================

/// データベースのスキーマと全行をFullパッケージに書き出す
pub struct ExportOperation {
    service: SchemaCompareService,
    source: DatabaseTarget,
    output: PathBuf,
}

impl ExportOperation {
    pub fn new(service: SchemaCompareService, source: DatabaseTarget, output: PathBuf) -> Self {
        Self {
            service,
            source,
            output,
        }
    }
}

#[async_trait]
impl LongRunningOperation for ExportOperation {
    type Output = PackageSummary;

    fn name(&self) -> String {
        format!("export {} -> {}", self.source, self.output.display())
    }

    async fn execute(&self, token: &CancellationToken) -> Result<PackageSummary, OperationError> {
        let package = read_package(&self.service, &self.source, PackageKind::Full, token).await?;
        token.check()?;
        write_package(&self.service, &self.output, &package)
    }

    async fn script(&self, token: &CancellationToken) -> Result<PackageSummary, OperationError> {
        let package = read_package(&self.service, &self.source, PackageKind::Full, token).await?;
        Ok(summarize(&self.output, &package, false))
    }
}

/// データベースのスキーマをSchemaパッケージに書き出す
pub struct ExtractOperation {
    service: SchemaCompareService,
    source: DatabaseTarget,
    output: PathBuf,
    application_name: Option<String>,
    application_version: Option<String>,
}

impl ExtractOperation {
    pub fn new(service: SchemaCompareService, source: DatabaseTarget, output: PathBuf) -> Self {
        Self {
            service,
            source,
            output,
            application_name: None,
            application_version: None,
        }
    }

    /// パッケージに記録するアプリケーション名とバージョン
    pub fn with_application(mut self, name: Option<String>, version: Option<String>) -> Self {
        self.application_name = name;
        self.application_version = version;
        self
    }

    async fn build(&self, token: &CancellationToken) -> Result<SchemaPackage, OperationError> {
        let package =
            read_package(&self.service, &self.source, PackageKind::Schema, token).await?;
        Ok(package.with_application(
            self.application_name.clone(),
            self.application_version.clone(),
        ))
    }
}

#[async_trait]
impl LongRunningOperation for ExtractOperation {
    type Output = PackageSummary;

    fn name(&self) -> String {
        format!("extract {} -> {}", self.source, self.output.display())
    }

    async fn execute(&self, token: &CancellationToken) -> Result<PackageSummary, OperationError> {
        let package = self.build(token).await?;
        token.check()?;
        write_package(&self.service, &self.output, &package)
    }

    async fn script(&self, token: &CancellationToken) -> Result<PackageSummary, OperationError> {
        let package = self.build(token).await?;
        Ok(summarize(&self.output, &package, false))
    }
}

async fn read_package(
    service: &SchemaCompareService,
    source: &DatabaseTarget,
    kind: PackageKind,
    token: &CancellationToken,
) -> Result<SchemaPackage, OperationError> {
    token.check()?;
    let database = service
        .connections()
        .connect(&source.connection, &source.database_name)
        .await?;

    let result = read_database(service, &database, kind, token).await;
    database.close().await;
    result
}

async fn read_database(
    service: &SchemaCompareService,
    database: &DatabaseHandle,
    kind: PackageKind,
    token: &CancellationToken,
) -> Result<SchemaPackage, OperationError> {
    token.check()?;
    let schema = service.provider().read_model(database).await?;

    match kind {
        PackageKind::Schema => Ok(SchemaPackage::schema_only(schema)),
        PackageKind::Full => {
            token.check()?;
            let data = read_schema_data(database.dialect, &database.pool, &schema)
                .await
                .map_err(|e| {
                    CompareError::provider(format!(
                        "Failed to read data of '{}': {:#}",
                        database.database_name, e
                    ))
                })?;
            Ok(SchemaPackage::full(schema, data))
        }
    }
}

fn write_package(
    service: &SchemaCompareService,
    output: &Path,
    package: &SchemaPackage,
) -> Result<PackageSummary, OperationError> {
    service.packages().write(output, package)?;
    info!(
        path = %output.display(),
        tables = package.schema.table_count(),
        rows = package.total_rows(),
        "Package written"
    );
    Ok(summarize(output, package, true))
}

fn summarize(output: &Path, package: &SchemaPackage, written: bool) -> PackageSummary {
    PackageSummary {
        path: output.to_path_buf(),
        kind: package.kind,
        table_count: package.schema.table_count(),
        row_count: package.total_rows(),
        written,
    }
}

// =============================================================================
// インポート / 配置
// =============================================================================

/// 新しいデータベースを作成するための手順
struct CreationPlan {
    dialect: Dialect,
    script: String,
    steps: Vec<DeploymentStep>,
    /// テーブル作成順の行データ
    data: Vec<(String, TableData)>,
}

impl CreationPlan {
    fn row_count(&self) -> usize {
        self.data.iter().map(|(_, data)| data.row_count()).sum()
    }
}

/// 新しいデータベースを作成してパッケージの内容を展開する共通処理
struct DatabaseCreator<'a> {
    service: &'a SchemaCompareService,
    package_path: &'a PathBuf,
    target: &'a DatabaseTarget,
}

impl DatabaseCreator<'_> {
    /// 空のデータベースとの比較からテーブル作成手順を組み立てる
    fn plan(&self, package: &SchemaPackage, with_data: bool) -> Result<CreationPlan, CompareError> {
        let dialect = self.service.connections().dialect(&self.target.connection)?;
        let provider = self.service.provider();

        let differences = provider.diff(&package.schema, &Schema::new(Some(dialect)))?;
        let result = ComparisonResult::new(
            EndpointDescriptor::package(self.package_path.clone()),
            self.target.endpoint(),
            Some(dialect),
            differences,
        );
        let steps = ScriptGenerationService::new(provider.clone()).render_steps(&result)?;

        let generator = create_generator(dialect);
        let mut data = Vec::new();
        if with_data {
            for step in &steps {
                if let Some(rows) = package.data.get(&step.object.name) {
                    if rows.row_count() > 0 {
                        data.push((step.object.name.clone(), rows.clone()));
                    }
                }
            }
        }

        let mut script = format_script(&result, &self.target.database_name, &steps);
        script.insert_str(
            0,
            &format!(
                "{}\n",
                generator.generate_create_database(&self.target.database_name)
            ),
        );
        for (table_name, rows) in &data {
            script.push_str(&format!("\n-- Data {}\n", table_name));
            for statement in generator.generate_insert(table_name, rows) {
                script.push_str(&statement);
                script.push('\n');
            }
        }

        Ok(CreationPlan {
            dialect,
            script,
            steps,
            data,
        })
    }

    /// データベースを作成し、手順を適用する
    async fn create(
        &self,
        plan: &CreationPlan,
        token: &CancellationToken,
    ) -> Result<(), OperationError> {
        token.check()?;
        self.service
            .connections()
            .create_database(&self.target.connection, &self.target.database_name)
            .await?;

        token.check()?;
        let database = self
            .service
            .connections()
            .connect(&self.target.connection, &self.target.database_name)
            .await?;

        let result = self.populate(&database, plan, token).await;
        database.close().await;
        result
    }

    async fn populate(
        &self,
        database: &DatabaseHandle,
        plan: &CreationPlan,
        token: &CancellationToken,
    ) -> Result<(), OperationError> {
        if database.has_tables().await? {
            return Err(CompareError::configuration(format!(
                "Database '{}' already contains tables",
                self.target.database_name
            ))
            .into());
        }

        apply_steps(self.service, database, &plan.steps, token).await?;

        let generator = create_generator(plan.dialect);
        for (table_name, rows) in &plan.data {
            token.check()?;
            database
                .execute_in_transaction(&generator.generate_insert(table_name, rows))
                .await
                .map_err(|e| {
                    CompareError::provider(format!(
                        "Failed to insert rows into '{}': {}",
                        table_name, e
                    ))
                })?;
            debug!(table = %table_name, rows = rows.row_count(), "Rows inserted");
        }
        Ok(())
    }
}

async fn apply_steps(
    service: &SchemaCompareService,
    database: &DatabaseHandle,
    steps: &[DeploymentStep],
    token: &CancellationToken,
) -> Result<(), OperationError> {
    for step in steps {
        token.check()?;
        service.provider().apply(step, database).await?;
        info!(object = %step.object, change = %step.change_kind, "Applied");
    }
    Ok(())
}

/// Fullパッケージから新しいデータベースを作成し、行データを投入する
pub struct ImportOperation {
    service: SchemaCompareService,
    package_path: PathBuf,
    target: DatabaseTarget,
}

impl ImportOperation {
    pub fn new(service: SchemaCompareService, package_path: PathBuf, target: DatabaseTarget) -> Self {
        Self {
            service,
            package_path,
            target,
        }
    }

    fn creator(&self) -> DatabaseCreator<'_> {
        DatabaseCreator {
            service: &self.service,
            package_path: &self.package_path,
            target: &self.target,
        }
    }

    fn plan(&self, token: &CancellationToken) -> Result<CreationPlan, OperationError> {
        token.check()?;
        let package = self.service.packages().read(&self.package_path)?;
        if !package.is_full() {
            return Err(CompareError::configuration(format!(
                "Package '{}' does not contain data; import requires a full package",
                self.package_path.display()
            ))
            .into());
        }
        Ok(self.creator().plan(&package, true)?)
    }

    fn summary(&self, plan: &CreationPlan, applied: bool) -> DeploymentSummary {
        DeploymentSummary {
            database_name: self.target.database_name.clone(),
            script: plan.script.clone(),
            applied,
            object_count: plan.steps.len(),
            row_count: plan.row_count(),
        }
    }
}

#[async_trait]
impl LongRunningOperation for ImportOperation {
    type Output = DeploymentSummary;

    fn name(&self) -> String {
        format!("import {} -> {}", self.package_path.display(), self.target)
    }

    async fn execute(&self, token: &CancellationToken) -> Result<DeploymentSummary, OperationError> {
        let plan = self.plan(token)?;
        self.creator().create(&plan, token).await?;
        info!(
            database = %self.target.database_name,
            tables = plan.steps.len(),
            rows = plan.row_count(),
            "Package imported"
        );
        Ok(self.summary(&plan, true))
    }

    async fn script(&self, token: &CancellationToken) -> Result<DeploymentSummary, OperationError> {
        let plan = self.plan(token)?;
        Ok(self.summary(&plan, false))
    }
}

/// パッケージのスキーマをデータベースに配置する
///
/// `upgrade_existing` がfalseなら新しいデータベースを作成し、
/// trueなら既存データベースとの差分をすべて適用します。
pub struct DeployOperation {
    service: SchemaCompareService,
    package_path: PathBuf,
    target: DatabaseTarget,
    upgrade_existing: bool,
}

impl DeployOperation {
    pub fn new(
        service: SchemaCompareService,
        package_path: PathBuf,
        target: DatabaseTarget,
        upgrade_existing: bool,
    ) -> Self {
        Self {
            service,
            package_path,
            target,
            upgrade_existing,
        }
    }

    fn creator(&self) -> DatabaseCreator<'_> {
        DatabaseCreator {
            service: &self.service,
            package_path: &self.package_path,
            target: &self.target,
        }
    }

    fn upgrader(&self) -> DatabaseUpgrader<'_> {
        DatabaseUpgrader {
            service: &self.service,
            package_path: &self.package_path,
            target: &self.target,
        }
    }

    fn create_plan(&self, token: &CancellationToken) -> Result<CreationPlan, OperationError> {
        token.check()?;
        let package = self.service.packages().read(&self.package_path)?;
        Ok(self.creator().plan(&package, false)?)
    }
}

#[async_trait]
impl LongRunningOperation for DeployOperation {
    type Output = DeploymentSummary;

    fn name(&self) -> String {
        format!("deploy {} -> {}", self.package_path.display(), self.target)
    }

    async fn execute(&self, token: &CancellationToken) -> Result<DeploymentSummary, OperationError> {
        if self.upgrade_existing {
            return self.upgrader().run(token, true).await;
        }

        let plan = self.create_plan(token)?;
        self.creator().create(&plan, token).await?;
        info!(
            database = %self.target.database_name,
            tables = plan.steps.len(),
            "Package deployed"
        );
        Ok(DeploymentSummary {
            database_name: self.target.database_name.clone(),
            script: plan.script,
            applied: true,
            object_count: plan.steps.len(),
            row_count: 0,
        })
    }

    async fn script(&self, token: &CancellationToken) -> Result<DeploymentSummary, OperationError> {
        if self.upgrade_existing {
            return self.upgrader().run(token, false).await;
        }

        let plan = self.create_plan(token)?;
        Ok(DeploymentSummary {
            database_name: self.target.database_name.clone(),
            script: plan.script,
            applied: false,
            object_count: plan.steps.len(),
            row_count: 0,
        })
    }
}

/// パッケージと既存データベースを比較し、差分をすべて適用する共通処理
struct DatabaseUpgrader<'a> {
    service: &'a SchemaCompareService,
    package_path: &'a PathBuf,
    target: &'a DatabaseTarget,
}

impl DatabaseUpgrader<'_> {
    /// パッケージ -> データベースの比較結果（全差分を包含）
    async fn compare(&self, token: &CancellationToken) -> Result<ComparisonResult, OperationError> {
        let result = self
            .service
            .compare(
                &EndpointDescriptor::package(self.package_path.clone()),
                &self.target.endpoint(),
                token,
            )
            .await?;

        if !result.is_valid() {
            return Err(CompareError::provider(
                result
                    .error_message()
                    .unwrap_or("comparison did not produce a valid result")
                    .to_string(),
            )
            .into());
        }
        Ok(result)
    }

    async fn run(
        &self,
        token: &CancellationToken,
        apply: bool,
    ) -> Result<DeploymentSummary, OperationError> {
        let result = self.compare(token).await?;
        let steps =
            ScriptGenerationService::new(self.service.provider().clone()).render_steps(&result)?;
        let script = format_script(&result, &self.target.database_name, &steps);

        if apply && !steps.is_empty() {
            token.check()?;
            let database = self
                .service
                .connections()
                .connect(&self.target.connection, &self.target.database_name)
                .await?;
            let applied = apply_steps(self.service, &database, &steps, token).await;
            database.close().await;
            applied?;
            info!(
                database = %self.target.database_name,
                objects = steps.len(),
                "Database upgraded"
            );
        }

        Ok(DeploymentSummary {
            database_name: self.target.database_name.clone(),
            script,
            applied: apply,
            object_count: steps.len(),
            row_count: 0,
        })
    }

    async fn plan(&self, token: &CancellationToken) -> Result<DeployPlan, OperationError> {
        let result = self.compare(token).await?;
        let actions = result
            .differences()
            .iter()
            .map(|difference| DeployAction {
                action: difference.change_kind().into(),
                object: difference.name().to_string(),
                details: difference
                    .children()
                    .iter()
                    .map(|child| format!("{} {}", child.change_kind(), child.identity()))
                    .collect(),
            })
            .collect();

        Ok(DeployPlan {
            source: result.source().to_string(),
            target: result.target().to_string(),
            actions,
        })
    }
}

/// パッケージ -> 既存データベースの配置スクリプトを生成する
///
/// Executeモードでは生成したスクリプトをそのまま適用します。
pub struct GenerateDeployScriptOperation {
    service: SchemaCompareService,
    package_path: PathBuf,
    target: DatabaseTarget,
}

impl GenerateDeployScriptOperation {
    pub fn new(service: SchemaCompareService, package_path: PathBuf, target: DatabaseTarget) -> Self {
        Self {
            service,
            package_path,
            target,
        }
    }

    fn upgrader(&self) -> DatabaseUpgrader<'_> {
        DatabaseUpgrader {
            service: &self.service,
            package_path: &self.package_path,
            target: &self.target,
        }
    }
}

#[async_trait]
impl LongRunningOperation for GenerateDeployScriptOperation {
    type Output = DeploymentSummary;

    fn name(&self) -> String {
        format!(
            "generate deploy script {} -> {}",
            self.package_path.display(),
            self.target
        )
    }

    async fn execute(&self, token: &CancellationToken) -> Result<DeploymentSummary, OperationError> {
        self.upgrader().run(token, true).await
    }

    async fn script(&self, token: &CancellationToken) -> Result<DeploymentSummary, OperationError> {
        self.upgrader().run(token, false).await
    }
}

/// パッケージ -> 既存データベースの配置計画を作成する（どちらのモードでも変更しない）
pub struct GenerateDeployPlanOperation {
    service: SchemaCompareService,
    package_path: PathBuf,
    target: DatabaseTarget,
}

impl GenerateDeployPlanOperation {
    pub fn new(service: SchemaCompareService, package_path: PathBuf, target: DatabaseTarget) -> Self {
        Self {
            service,
            package_path,
            target,
        }
    }

    fn upgrader(&self) -> DatabaseUpgrader<'_> {
        DatabaseUpgrader {
            service: &self.service,
            package_path: &self.package_path,
            target: &self.target,
        }
    }
}

#[async_trait]
impl LongRunningOperation for GenerateDeployPlanOperation {
    type Output = DeployPlan;

    fn name(&self) -> String {
        format!(
            "generate deploy plan {} -> {}",
            self.package_path.display(),
            self.target
        )
    }

    async fn execute(&self, token: &CancellationToken) -> Result<DeployPlan, OperationError> {
        self.upgrader().plan(token).await
    }

    async fn script(&self, token: &CancellationToken) -> Result<DeployPlan, OperationError> {
        self.upgrader().plan(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_from_change_kind() {
        assert_eq!(DeployActionKind::from(ChangeKind::Add), DeployActionKind::Create);
        assert_eq!(DeployActionKind::from(ChangeKind::Drop), DeployActionKind::Drop);
        assert_eq!(DeployActionKind::from(ChangeKind::Change), DeployActionKind::Alter);
    }

    #[test]
    fn test_deploy_plan_counts() {
        let plan = DeployPlan {
            source: "package:app.dacpac".to_string(),
            target: "db:local/app.db".to_string(),
            actions: vec![
                DeployAction {
                    action: DeployActionKind::Create,
                    object: "table1".to_string(),
                    details: Vec::new(),
                },
                DeployAction {
                    action: DeployActionKind::Alter,
                    object: "table2".to_string(),
                    details: vec!["Add Column table2.col2".to_string()],
                },
            ],
        };
        assert!(!plan.is_empty());
        assert_eq!(plan.count(DeployActionKind::Create), 1);
        assert_eq!(plan.count(DeployActionKind::Drop), 0);
    }

    #[test]
    fn test_database_target_display() {
        let target = DatabaseTarget::new("local", "app.db");
        assert_eq!(target.to_string(), "local/app.db");
        assert!(target.endpoint().is_database());
    }
}
