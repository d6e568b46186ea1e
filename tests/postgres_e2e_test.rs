/// PostgreSQLに対するエンドツーエンドテスト
///
/// testcontainersでPostgreSQLを起動し、比較 -> 発行 -> 再比較 を検証します。
///
/// 注意: このテストはDockerが必要です。

#[cfg(test)]
mod postgres_e2e_tests {
    use schemacompare::adapters::database::{ConfigConnectionProvider, ConnectionProvider};
    use schemacompare::adapters::package_store::FilePackageStore;
    use schemacompare::core::config::Config;
    use schemacompare::core::endpoint::EndpointDescriptor;
    use schemacompare::core::operation::{CancellationToken, TaskExecutionMode};
    use schemacompare::core::schema_diff::ChangeKind;
    use schemacompare::services::operation_registry::OperationRegistry;
    use schemacompare::services::schema_compare::SchemaCompareService;
    use schemacompare::services::schema_compare_api::{
        CompareRequest, PublishRequest, SchemaCompareApi,
    };
    use schemacompare::services::schema_compare_provider::TableSchemaProvider;
    use std::sync::Arc;
    use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
    use testcontainers_modules::postgres::Postgres;

    async fn start_postgres() -> anyhow::Result<(ContainerAsync<Postgres>, Arc<ConfigConnectionProvider>)> {
        let container = Postgres::default().with_tag("16-alpine").start().await?;
        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;

        let config: Config = format!(
            "version: \"1.0\"\nconnections:\n  pg:\n    dialect: postgresql\n    host: {}\n    port: {}\n    database: postgres\n    user: postgres\n    password: postgres\n",
            host, port
        )
        .parse()?;

        Ok((container, Arc::new(ConfigConnectionProvider::new(config))))
    }

    async fn create_db(connections: &ConfigConnectionProvider, name: &str, statements: &[&str]) {
        connections.create_database("pg", name).await.unwrap();
        if statements.is_empty() {
            return;
        }
        let database = connections.connect("pg", name).await.unwrap();
        let statements: Vec<String> = statements.iter().map(|s| s.to_string()).collect();
        database.execute_in_transaction(&statements).await.unwrap();
        database.close().await;
    }

    #[tokio::test]
    #[ignore] // Docker必須のため、通常のテスト実行ではスキップ
    async fn test_publish_converges_on_postgres() {
        let (_container, connections) = start_postgres().await.unwrap();

        create_db(
            &connections,
            "source_db",
            &[
                "CREATE TABLE users (id INTEGER NOT NULL, email VARCHAR(255) NOT NULL, PRIMARY KEY (id))",
                "CREATE TABLE posts (id INTEGER NOT NULL, user_id INTEGER, body TEXT, PRIMARY KEY (id), CONSTRAINT posts_user_fk FOREIGN KEY (user_id) REFERENCES users (id))",
            ],
        )
        .await;
        create_db(
            &connections,
            "target_db",
            &[
                "CREATE TABLE users (id INTEGER NOT NULL, PRIMARY KEY (id))",
                "CREATE TABLE legacy (id INTEGER NOT NULL, PRIMARY KEY (id))",
            ],
        )
        .await;

        let engine = SchemaCompareService::new(
            Arc::new(TableSchemaProvider::new()),
            connections.clone(),
            Arc::new(FilePackageStore::new()),
        );
        let api = SchemaCompareApi::from_engine(Arc::new(OperationRegistry::new()), engine);
        let token = CancellationToken::new();
        let request = CompareRequest {
            operation_id: None,
            source: EndpointDescriptor::database("pg", "source_db"),
            target: EndpointDescriptor::database("pg", "target_db"),
        };

        let response = api
            .compare(request.clone(), &token)
            .await
            .succeeded()
            .unwrap();
        assert!(response.is_valid);
        assert_eq!(response.differences.len(), 3);
        let kinds: Vec<ChangeKind> = response
            .differences
            .iter()
            .map(|entry| entry.change_kind)
            .collect();
        assert!(kinds.contains(&ChangeKind::Add));
        assert!(kinds.contains(&ChangeKind::Change));
        assert!(kinds.contains(&ChangeKind::Drop));

        let published = api
            .publish(
                PublishRequest {
                    operation_id: response.operation_id.clone(),
                    target_name: "target_db".to_string(),
                },
                TaskExecutionMode::Execute,
                &token,
            )
            .await
            .succeeded()
            .unwrap();
        assert!(published.success, "{:?}", published.errors);

        let after = api.compare(request, &token).await.succeeded().unwrap();
        assert!(after.is_equal, "{:?}", after.differences);
    }
}
