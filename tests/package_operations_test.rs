/// パッケージ操作の統合テスト
///
/// export / extract / import / deploy / deploy-report を一時ディレクトリ上の
/// SQLiteデータベースで実行し、結果をスキーマ比較で検証します。

#[cfg(test)]
mod package_operations_tests {
    use schemacompare::adapters::database::{ConfigConnectionProvider, ConnectionProvider};
    use schemacompare::adapters::package_store::{FilePackageStore, PackageStore};
    use schemacompare::core::config::Config;
    use schemacompare::core::endpoint::EndpointDescriptor;
    use schemacompare::core::operation::{CancellationToken, TaskExecutionMode};
    use schemacompare::core::package::PackageKind;
    use schemacompare::services::operation_runner::run;
    use schemacompare::services::package_operations::{
        DatabaseTarget, DeployActionKind, DeployOperation, ExportOperation, ExtractOperation,
        GenerateDeployPlanOperation, GenerateDeployScriptOperation, ImportOperation,
    };
    use schemacompare::services::schema_compare::SchemaCompareService;
    use schemacompare::services::schema_compare_provider::TableSchemaProvider;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        dir: PathBuf,
        connections: Arc<ConfigConnectionProvider>,
        service: SchemaCompareService,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let config: Config = "version: \"1.0\"\nconnections:\n  local:\n    dialect: sqlite\n"
                .parse()
                .unwrap();
            let connections = Arc::new(ConfigConnectionProvider::new(config));
            let service = SchemaCompareService::new(
                Arc::new(TableSchemaProvider::new()),
                connections.clone(),
                Arc::new(FilePackageStore::new()),
            );
            Self {
                dir: temp_dir.path().to_path_buf(),
                _temp_dir: temp_dir,
                connections,
                service,
            }
        }

        fn path(&self, name: &str) -> String {
            self.dir.join(name).to_string_lossy().to_string()
        }

        fn target(&self, name: &str) -> DatabaseTarget {
            DatabaseTarget::new("local", self.path(name))
        }

        async fn create_db(&self, name: &str, statements: &[&str]) {
            let path = self.path(name);
            self.connections.create_database("local", &path).await.unwrap();
            if statements.is_empty() {
                return;
            }
            let database = self.connections.connect("local", &path).await.unwrap();
            let statements: Vec<String> = statements.iter().map(|s| s.to_string()).collect();
            database.execute_in_transaction(&statements).await.unwrap();
            database.close().await;
        }

        async fn count_rows(&self, name: &str, table: &str) -> i64 {
            let database = self.connections.connect("local", &self.path(name)).await.unwrap();
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&database.pool)
                .await
                .unwrap();
            database.close().await;
            count
        }

        /// 2つのデータベースのスキーマが等しいか
        async fn schemas_equal(&self, left: &str, right: &str) -> bool {
            let result = self
                .service
                .compare(
                    &EndpointDescriptor::database("local", self.path(left)),
                    &EndpointDescriptor::database("local", self.path(right)),
                    &CancellationToken::new(),
                )
                .await
                .unwrap();
            assert!(result.is_valid(), "{:?}", result.error_message());
            result.is_equal()
        }

        async fn create_source(&self) {
            self.create_db(
                "source.db",
                &[
                    "CREATE TABLE users (id INTEGER NOT NULL, name TEXT NOT NULL, PRIMARY KEY (id))",
                    "CREATE TABLE posts (id INTEGER NOT NULL, user_id INTEGER NOT NULL, title TEXT, PRIMARY KEY (id), FOREIGN KEY (user_id) REFERENCES users (id))",
                    "INSERT INTO users (id, name) VALUES (1, 'alice'), (2, 'bob')",
                    "INSERT INTO posts (id, user_id, title) VALUES (1, 1, 'hello'), (2, 1, NULL), (3, 2, 'it''s')",
                ],
            )
            .await;
        }
    }

    #[tokio::test]
    async fn test_export_then_import_restores_schema_and_rows() {
        let fixture = Fixture::new();
        fixture.create_source().await;
        let package = fixture.dir.join("source.bacpac");
        let token = CancellationToken::new();

        let export = ExportOperation::new(
            fixture.service.clone(),
            fixture.target("source.db"),
            package.clone(),
        );
        let summary = run(&export, &token, TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();
        assert!(summary.written);
        assert_eq!(summary.kind, PackageKind::Full);
        assert_eq!(summary.table_count, 2);
        assert_eq!(summary.row_count, 5);

        let import = ImportOperation::new(
            fixture.service.clone(),
            package,
            fixture.target("restored.db"),
        );
        let deployed = run(&import, &token, TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();
        assert!(deployed.applied);
        assert_eq!(deployed.object_count, 2);
        assert_eq!(deployed.row_count, 5);

        assert!(fixture.schemas_equal("source.db", "restored.db").await);
        assert_eq!(fixture.count_rows("restored.db", "users").await, 2);
        assert_eq!(fixture.count_rows("restored.db", "posts").await, 3);
    }

    #[tokio::test]
    async fn test_export_script_mode_does_not_write() {
        let fixture = Fixture::new();
        fixture.create_source().await;
        let package = fixture.dir.join("source.bacpac");

        let export = ExportOperation::new(
            fixture.service.clone(),
            fixture.target("source.db"),
            package.clone(),
        );
        let summary = run(&export, &CancellationToken::new(), TaskExecutionMode::Script)
            .await
            .succeeded()
            .unwrap();

        assert!(!summary.written);
        assert_eq!(summary.row_count, 5);
        assert!(!package.exists());
    }

    #[tokio::test]
    async fn test_cancelled_export_writes_nothing() {
        let fixture = Fixture::new();
        fixture.create_source().await;
        let package = fixture.dir.join("source.bacpac");

        let token = CancellationToken::new();
        token.cancel();
        let export = ExportOperation::new(
            fixture.service.clone(),
            fixture.target("source.db"),
            package.clone(),
        );
        let outcome = run(&export, &token, TaskExecutionMode::Execute).await;

        assert!(outcome.is_cancelled());
        assert!(!package.exists());
    }

    #[tokio::test]
    async fn test_extract_records_application() {
        let fixture = Fixture::new();
        fixture.create_source().await;
        let package_path = fixture.dir.join("source.dacpac");

        let extract = ExtractOperation::new(
            fixture.service.clone(),
            fixture.target("source.db"),
            package_path.clone(),
        )
        .with_application(Some("blog".to_string()), Some("1.2.0".to_string()));
        let summary = run(&extract, &CancellationToken::new(), TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();
        assert_eq!(summary.kind, PackageKind::Schema);
        assert_eq!(summary.row_count, 0);

        let package = FilePackageStore::new().read(&package_path).unwrap();
        assert!(!package.is_full());
        assert_eq!(package.application_name.as_deref(), Some("blog"));
        assert_eq!(package.application_version.as_deref(), Some("1.2.0"));
        assert_eq!(package.schema.table_count(), 2);
    }

    #[tokio::test]
    async fn test_import_requires_full_package() {
        let fixture = Fixture::new();
        fixture.create_source().await;
        let package = fixture.dir.join("source.dacpac");
        let token = CancellationToken::new();

        let extract = ExtractOperation::new(
            fixture.service.clone(),
            fixture.target("source.db"),
            package.clone(),
        );
        run(&extract, &token, TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();

        let import = ImportOperation::new(
            fixture.service.clone(),
            package,
            fixture.target("restored.db"),
        );
        let outcome = run(&import, &token, TaskExecutionMode::Execute).await;
        assert!(outcome.error().unwrap().is_configuration());
        assert!(!fixture.dir.join("restored.db").exists());
    }

    #[tokio::test]
    async fn test_extract_then_deploy_creates_equal_schema() {
        let fixture = Fixture::new();
        fixture.create_source().await;
        let package = fixture.dir.join("source.dacpac");
        let token = CancellationToken::new();

        let extract = ExtractOperation::new(
            fixture.service.clone(),
            fixture.target("source.db"),
            package.clone(),
        );
        run(&extract, &token, TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();

        let deploy = DeployOperation::new(
            fixture.service.clone(),
            package,
            fixture.target("deployed.db"),
            false,
        );
        let summary = run(&deploy, &token, TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();
        assert!(summary.applied);
        assert_eq!(summary.object_count, 2);
        // 参照先が先に作成される
        let users = summary.script.find(r#"CREATE TABLE "users""#).unwrap();
        let posts = summary.script.find(r#"CREATE TABLE "posts""#).unwrap();
        assert!(users < posts);

        assert!(fixture.schemas_equal("source.db", "deployed.db").await);
        assert_eq!(fixture.count_rows("deployed.db", "users").await, 0);
    }

    #[tokio::test]
    async fn test_deploy_into_database_with_tables_is_rejected() {
        let fixture = Fixture::new();
        fixture.create_source().await;
        fixture
            .create_db("occupied.db", &["CREATE TABLE other (id INTEGER)"])
            .await;
        let package = fixture.dir.join("source.dacpac");
        let token = CancellationToken::new();

        let extract = ExtractOperation::new(
            fixture.service.clone(),
            fixture.target("source.db"),
            package.clone(),
        );
        run(&extract, &token, TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();

        let deploy = DeployOperation::new(
            fixture.service.clone(),
            package,
            fixture.target("occupied.db"),
            false,
        );
        let outcome = run(&deploy, &token, TaskExecutionMode::Execute).await;
        assert!(outcome.error().unwrap().is_configuration());
    }

    /// 配置先: usersは列が1つ少なく、postsは無く、legacyが余分
    async fn create_outdated_target(fixture: &Fixture) {
        fixture
            .create_db(
                "outdated.db",
                &[
                    "CREATE TABLE users (id INTEGER NOT NULL, PRIMARY KEY (id))",
                    "CREATE TABLE legacy (id INTEGER NOT NULL, PRIMARY KEY (id))",
                ],
            )
            .await;
    }

    async fn extract_source(fixture: &Fixture) -> PathBuf {
        fixture.create_source().await;
        let package = fixture.dir.join("source.dacpac");
        let extract = ExtractOperation::new(
            fixture.service.clone(),
            fixture.target("source.db"),
            package.clone(),
        );
        run(&extract, &CancellationToken::new(), TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();
        package
    }

    #[tokio::test]
    async fn test_deploy_plan_reports_create_alter_drop() {
        let fixture = Fixture::new();
        let package = extract_source(&fixture).await;
        create_outdated_target(&fixture).await;

        let operation = GenerateDeployPlanOperation::new(
            fixture.service.clone(),
            package,
            fixture.target("outdated.db"),
        );
        let plan = run(&operation, &CancellationToken::new(), TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();

        assert_eq!(plan.count(DeployActionKind::Create), 1);
        assert_eq!(plan.count(DeployActionKind::Alter), 1);
        assert_eq!(plan.count(DeployActionKind::Drop), 1);

        let alter = plan
            .actions
            .iter()
            .find(|action| action.action == DeployActionKind::Alter)
            .unwrap();
        assert_eq!(alter.object, "users");
        assert!(alter.details.iter().any(|detail| detail.contains("users.name")));

        // 計画の作成はターゲットを変更しない
        assert!(!fixture.schemas_equal("source.db", "outdated.db").await);
    }

    #[tokio::test]
    async fn test_deploy_script_leaves_target_unchanged() {
        let fixture = Fixture::new();
        let package = extract_source(&fixture).await;
        create_outdated_target(&fixture).await;

        let operation = GenerateDeployScriptOperation::new(
            fixture.service.clone(),
            package,
            fixture.target("outdated.db"),
        );
        let summary = run(&operation, &CancellationToken::new(), TaskExecutionMode::Script)
            .await
            .succeeded()
            .unwrap();

        assert!(!summary.applied);
        assert_eq!(summary.object_count, 3);
        assert!(summary.script.contains(r#"CREATE TABLE "posts""#));
        assert!(summary.script.contains(r#"DROP TABLE"#));
        assert!(!fixture.schemas_equal("source.db", "outdated.db").await);
    }

    #[tokio::test]
    async fn test_deploy_upgrade_existing_converges() {
        let fixture = Fixture::new();
        let package = extract_source(&fixture).await;
        create_outdated_target(&fixture).await;

        let deploy = DeployOperation::new(
            fixture.service.clone(),
            package,
            fixture.target("outdated.db"),
            true,
        );
        let summary = run(&deploy, &CancellationToken::new(), TaskExecutionMode::Execute)
            .await
            .succeeded()
            .unwrap();

        assert!(summary.applied);
        assert_eq!(summary.object_count, 3);
        assert!(fixture.schemas_equal("source.db", "outdated.db").await);
    }

    #[tokio::test]
    async fn test_failed_operation_names_itself() {
        let fixture = Fixture::new();
        let missing = fixture.dir.join("missing.dacpac");

        let deploy = DeployOperation::new(
            fixture.service.clone(),
            missing,
            fixture.target("deployed.db"),
            false,
        );
        let outcome = run(&deploy, &CancellationToken::new(), TaskExecutionMode::Script).await;

        let err = outcome.error().unwrap();
        assert!(err.is_io());
        assert!(err.to_string().starts_with("deploy "));
    }
}
