//! Database initialization pipeline.
//!
//! Runs once at startup: resolve the active configuration, connect through the
//! matching backend, and for relational backends register models and
//! synchronize the schema. The first failing step ends the run.

use std::time::{Duration, Instant};

use common::config::DatabaseSettings;
use common::errors::{AppError, AppResult};
use common::models::{DatabaseConfig, DriverKind, ModelDefinition};
use mongodb::bson::doc;
use redis::aio::ConnectionManager as RedisConnectionManager;
use serde::Serialize;
use utoipa::ToSchema;

use crate::connector::{Connection, ConnectorFactory};
use crate::engine::QueryEngine;
use crate::init_state::InitStateStore;
use crate::registrar::ModelRegistrar;
use crate::resolver::{ConfigEntries, ConfigResolver, ResolvedDatabase};

/// Pipeline progress. `Ready` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Resolving,
    Connecting,
    Connected,
    SchemaRegistering,
    SchemaSyncing,
    Ready,
    Failed,
}

/// Handle to the active database, normalized per backend.
#[derive(Clone)]
pub enum DatabaseHandle {
    /// The configured database of the document store.
    Document(mongodb::Database),
    OrderedKey(RedisConnectionManager),
    Relational(QueryEngine),
}

impl DatabaseHandle {
    /// Round-trips a trivial command and returns the latency.
    pub async fn ping(&self) -> AppResult<Duration> {
        let start = Instant::now();
        match self {
            DatabaseHandle::Document(database) => {
                database
                    .run_command(doc! { "ping": 1 })
                    .await
                    .map_err(|e| AppError::MongoConnection(e.to_string()))?;
            }
            DatabaseHandle::OrderedKey(manager) => {
                let mut conn = manager.clone();
                redis::cmd("PING")
                    .query_async::<String>(&mut conn)
                    .await
                    .map_err(|e| AppError::RedisOperation(e.to_string()))?;
            }
            DatabaseHandle::Relational(engine) => {
                sqlx::query("SELECT 1")
                    .execute(engine.pool())
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
            }
        }
        Ok(start.elapsed())
    }
}

/// The connected database with the configuration it came from.
#[derive(Clone)]
pub struct ActiveDatabase {
    /// Symbolic name from `ACTIVE_DATABASE`.
    pub name: String,
    pub kind: DriverKind,
    pub config: DatabaseConfig,
    pub handle: DatabaseHandle,
}

/// Outcome of a successful pipeline run, handed to the HTTP layer.
pub struct StartupResult {
    pub stage: PipelineStage,
    /// `None` when the database is disabled.
    pub database: Option<ActiveDatabase>,
    /// Registered model names (relational backends only).
    pub registered_models: Vec<String>,
    /// Whether this run performed the one-time destructive sync.
    pub schema_initialized: bool,
}

impl StartupResult {
    /// Result of a run with the database switched off.
    pub fn disabled() -> Self {
        Self {
            stage: PipelineStage::Ready,
            database: None,
            registered_models: Vec::new(),
            schema_initialized: false,
        }
    }
}

/// Normalizes a raw connection into the handle downstream code uses.
fn activate(resolved: ResolvedDatabase, connection: Connection) -> AppResult<ActiveDatabase> {
    let handle = match (resolved.kind, connection) {
        (DriverKind::Document, Connection::Document(client)) => {
            DatabaseHandle::Document(client.database(&resolved.config.database))
        }
        (DriverKind::OrderedKey, Connection::OrderedKey(manager)) => {
            DatabaseHandle::OrderedKey(manager)
        }
        (DriverKind::Relational, Connection::Relational(engine)) => {
            DatabaseHandle::Relational(engine)
        }
        (kind, _) => {
            return Err(AppError::Internal(format!(
                "connector returned a connection that does not match driver {kind}"
            )))
        }
    };

    Ok(ActiveDatabase {
        name: resolved.name,
        kind: resolved.kind,
        config: resolved.config,
        handle,
    })
}

/// Sequences resolution, connection and schema registration.
pub struct InitializationPipeline {
    settings: DatabaseSettings,
    entries: Option<ConfigEntries>,
    models: Vec<ModelDefinition>,
    init_state: InitStateStore,
}

impl InitializationPipeline {
    /// Creates a pipeline that reads configurations from `settings.config_path`.
    pub fn new(settings: DatabaseSettings, models: Vec<ModelDefinition>) -> Self {
        let init_state = InitStateStore::new(&settings.init_state_path);
        Self {
            settings,
            entries: None,
            models,
            init_state,
        }
    }

    /// Uses in-memory configuration entries instead of reading the config file.
    pub fn with_configs(mut self, entries: ConfigEntries) -> Self {
        self.entries = Some(entries);
        self
    }

    /// Runs the pipeline to `Ready`, or returns the first error.
    pub async fn run(&self, connectors: &dyn ConnectorFactory) -> AppResult<StartupResult> {
        tracing::info!(
            stage = ?PipelineStage::Idle,
            enabled = self.settings.enabled,
            database = %self.settings.active,
            "Database pipeline starting"
        );
        let result = self.execute(connectors).await;
        match &result {
            Ok(startup) => {
                tracing::info!(
                    stage = ?PipelineStage::Ready,
                    database = ?startup.database.as_ref().map(|d| &d.name),
                    driver = ?startup.database.as_ref().map(|d| d.kind),
                    models = startup.registered_models.len(),
                    schema_initialized = startup.schema_initialized,
                    "Database pipeline ready"
                );
            }
            Err(e) => {
                tracing::error!(
                    stage = ?PipelineStage::Failed,
                    database = %self.settings.active,
                    code = e.code(),
                    error = %e,
                    "Database pipeline failed"
                );
            }
        }
        result
    }

    async fn execute(&self, connectors: &dyn ConnectorFactory) -> AppResult<StartupResult> {
        if !self.settings.enabled {
            tracing::info!("Database disabled, skipping initialization");
            return Ok(StartupResult::disabled());
        }

        tracing::info!(
            stage = ?PipelineStage::Resolving,
            database = %self.settings.active,
            "Resolving database configuration"
        );
        let resolver = match &self.entries {
            Some(entries) => ConfigResolver::new(entries.clone()),
            None => ConfigResolver::from_file(&self.settings.config_path).await?,
        };
        let resolved = resolver.resolve(&self.settings.active)?;

        tracing::info!(
            stage = ?PipelineStage::Connecting,
            database = %resolved.name,
            driver = %resolved.kind,
            "Connecting to database"
        );
        let connection = connectors
            .connector(resolved.kind)
            .connect(&resolved.config)
            .await?;

        let mut active = activate(resolved, connection)?;
        tracing::info!(
            stage = ?PipelineStage::Connected,
            database = %active.name,
            driver = %active.kind,
            "Database connected"
        );

        let (registered_models, schema_initialized) = match &mut active.handle {
            DatabaseHandle::Relational(engine) => {
                self.register_schema(engine, &active.name, active.config.prefix())
                    .await?
            }
            _ => (Vec::new(), false),
        };

        Ok(StartupResult {
            stage: PipelineStage::Ready,
            database: Some(active),
            registered_models,
            schema_initialized,
        })
    }

    /// Whether this run should drop and recreate tables: initialization was
    /// requested and the state record does not say it already happened.
    async fn destructive_sync(&self) -> AppResult<bool> {
        if !self.settings.initialize {
            return Ok(false);
        }
        if self.init_state.load().await?.schema_initialized {
            tracing::info!(
                path = %self.init_state.path().display(),
                "Schema already initialized, skipping destructive sync"
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Registers applicable models, awaits the sync, and records a completed
    /// destructive initialization.
    async fn register_schema(
        &self,
        engine: &mut QueryEngine,
        database: &str,
        prefix: &str,
    ) -> AppResult<(Vec<String>, bool)> {
        let registered = ModelRegistrar::register(engine, &self.models, database, prefix);
        tracing::info!(
            stage = ?PipelineStage::SchemaRegistering,
            database,
            models = registered.len(),
            "Models registered"
        );

        let force = self.destructive_sync().await?;
        tracing::info!(
            stage = ?PipelineStage::SchemaSyncing,
            database,
            models = registered.len(),
            destructive = force,
            "Synchronizing schema"
        );
        engine.sync(force).await?;

        let initialized = force && self.init_state.mark_initialized(database).await?;
        Ok((registered, initialized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

    use crate::connector::{document_uri, DriverConnector};
    use crate::engine::sync_statements;

    /// Records every connect attempt. Document and relational connections are
    /// lazy and never reach a server; ordered-key connections fail.
    #[derive(Clone, Default)]
    struct FakeConnectors {
        attempts: Arc<Mutex<Vec<(DriverKind, String)>>>,
    }

    impl FakeConnectors {
        fn attempts(&self) -> Vec<(DriverKind, String)> {
            self.attempts.lock().unwrap().clone()
        }
    }

    struct FakeConnector {
        kind: DriverKind,
        attempts: Arc<Mutex<Vec<(DriverKind, String)>>>,
    }

    #[async_trait]
    impl DriverConnector for FakeConnector {
        async fn connect(&self, config: &DatabaseConfig) -> AppResult<Connection> {
            match self.kind {
                DriverKind::Document => {
                    let uri = document_uri(config);
                    self.attempts.lock().unwrap().push((self.kind, uri.clone()));
                    let client = mongodb::Client::with_uri_str(&uri)
                        .await
                        .map_err(|e| AppError::MongoConnection(e.to_string()))?;
                    Ok(Connection::Document(client))
                }
                DriverKind::Relational => {
                    self.attempts
                        .lock()
                        .unwrap()
                        .push((self.kind, config.host.clone()));
                    let options = MySqlConnectOptions::new()
                        .host(&config.host)
                        .port(config.port)
                        .database(&config.database);
                    let pool = MySqlPoolOptions::new()
                        .acquire_timeout(Duration::from_secs(1))
                        .connect_lazy_with(options);
                    Ok(Connection::Relational(QueryEngine::new(pool)))
                }
                DriverKind::OrderedKey => {
                    self.attempts
                        .lock()
                        .unwrap()
                        .push((self.kind, config.host.clone()));
                    Err(AppError::RedisConnection("connection refused".into()))
                }
            }
        }
    }

    impl ConnectorFactory for FakeConnectors {
        fn connector(&self, kind: DriverKind) -> Box<dyn DriverConnector> {
            Box::new(FakeConnector {
                kind,
                attempts: self.attempts.clone(),
            })
        }
    }

    fn settings(dir: &Path, active: &str) -> DatabaseSettings {
        DatabaseSettings {
            enabled: true,
            active: active.to_string(),
            initialize: true,
            config_path: dir.join("database.json"),
            init_state_path: dir.join("init_state.json"),
        }
    }

    fn configs() -> ConfigEntries {
        serde_json::from_value(serde_json::json!({
            "primary": {
                "dbdriver": "mysqli", "host": "127.0.0.1", "port": 1,
                "username": "root", "password": "", "database": "app"
            },
            "cache": {
                "dbdriver": "mongodb", "host": "localhost", "port": 27017,
                "database": "cache", "dsn": ""
            },
            "sessions": {
                "dbdriver": "redis", "host": "127.0.0.1", "port": 6379, "database": "0"
            },
            "legacy": { "dbdriver": "unknown", "database": "old" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_disabled_attempts_no_connection() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path(), "cache");
        settings.enabled = false;
        let connectors = FakeConnectors::default();

        let startup = InitializationPipeline::new(settings, Vec::new())
            .run(&connectors)
            .await
            .unwrap();

        assert_eq!(startup.stage, PipelineStage::Ready);
        assert!(startup.database.is_none());
        assert!(startup.registered_models.is_empty());
        assert!(connectors.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_name_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let connectors = FakeConnectors::default();

        let err = InitializationPipeline::new(settings(dir.path(), "reporting"), Vec::new())
            .with_configs(configs())
            .run(&connectors)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, AppError::ConfigNotFound(name) if name == "reporting"));
        assert!(connectors.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_driver_fails_instead_of_hanging() {
        let dir = tempfile::tempdir().unwrap();
        let connectors = FakeConnectors::default();

        let err = InitializationPipeline::new(settings(dir.path(), "legacy"), Vec::new())
            .with_configs(configs())
            .run(&connectors)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, AppError::UnsupportedDriver(_)));
        assert!(connectors.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = InitializationPipeline::new(settings(dir.path(), "cache"), Vec::new())
            .run(&FakeConnectors::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_connection_error_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), "sessions");
        let state_path = settings.init_state_path.clone();
        let connectors = FakeConnectors::default();

        let err = InitializationPipeline::new(settings, crate::models::registry())
            .with_configs(configs())
            .run(&connectors)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, AppError::RedisConnection(_)));
        assert_eq!(connectors.attempts(), vec![(DriverKind::OrderedKey, "127.0.0.1".to_string())]);
        assert!(!state_path.exists());
    }

    #[tokio::test]
    async fn test_document_store_ready_without_registration() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), "cache");
        let state_path = settings.init_state_path.clone();
        let connectors = FakeConnectors::default();

        let startup = InitializationPipeline::new(settings, crate::models::registry())
            .with_configs(configs())
            .run(&connectors)
            .await
            .unwrap();

        assert_eq!(
            connectors.attempts(),
            vec![(DriverKind::Document, "mongodb://localhost:27017".to_string())]
        );
        assert_eq!(startup.stage, PipelineStage::Ready);
        assert!(startup.registered_models.is_empty());
        assert!(!startup.schema_initialized);
        assert!(!state_path.exists());

        let active = startup.database.unwrap();
        assert_eq!(active.name, "cache");
        assert_eq!(active.kind, DriverKind::Document);
        match active.handle {
            DatabaseHandle::Document(database) => assert_eq!(database.name(), "cache"),
            _ => panic!("expected a document handle"),
        }
    }

    #[tokio::test]
    async fn test_mismatched_connection_is_internal_error() {
        let resolved = ConfigResolver::new(configs()).resolve("sessions").unwrap();
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();

        let err = activate(resolved, Connection::Document(client)).err().unwrap();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_failed_sync_leaves_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), "primary");
        let state_path = settings.init_state_path.clone();
        let connectors = FakeConnectors::default();

        let err = InitializationPipeline::new(settings, crate::models::registry())
            .with_configs(configs())
            .run(&connectors)
            .await
            .err()
            .unwrap();

        assert_eq!(connectors.attempts(), vec![(DriverKind::Relational, "127.0.0.1".to_string())]);
        match err {
            AppError::SchemaSync(message) => {
                assert!(message.starts_with("DROP TABLE IF EXISTS `audit_logs`"), "{message}")
            }
            other => panic!("expected a schema sync error, got {other:?}"),
        }
        assert!(!state_path.exists());
    }

    #[tokio::test]
    async fn test_recorded_initialization_skips_drop() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), "primary");
        let store = InitStateStore::new(&settings.init_state_path);
        assert!(store.mark_initialized("primary").await.unwrap());
        let recorded = std::fs::read_to_string(store.path()).unwrap();

        let pipeline = InitializationPipeline::new(settings, crate::models::registry())
            .with_configs(configs());
        assert!(!pipeline.destructive_sync().await.unwrap());

        let err = pipeline.run(&FakeConnectors::default()).await.err().unwrap();
        match err {
            AppError::SchemaSync(message) => {
                assert!(message.starts_with("CREATE TABLE IF NOT EXISTS `users`"), "{message}");
                assert!(!message.contains("DROP"));
            }
            other => panic!("expected a schema sync error, got {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), recorded);
    }

    #[tokio::test]
    async fn test_destructive_sync_requires_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path(), "primary");
        let pipeline = InitializationPipeline::new(settings.clone(), Vec::new());
        assert!(pipeline.destructive_sync().await.unwrap());

        settings.initialize = false;
        let pipeline = InitializationPipeline::new(settings, Vec::new());
        assert!(!pipeline.destructive_sync().await.unwrap());

        let tables = ModelRegistrar::plan(&crate::models::registry(), "primary", "");
        let statements = sync_statements(&tables, false);
        assert!(statements.iter().all(|s| s.starts_with("CREATE TABLE")));
    }

    #[tokio::test]
    #[ignore = "requires a MySQL server on localhost:3306 with root access"]
    async fn test_relational_initializes_once() {
        use common::config::AppEnv;
        use crate::connector::DefaultConnectors;

        let dir = tempfile::tempdir().unwrap();
        let configs: ConfigEntries = serde_json::from_value(serde_json::json!({
            "primary": {
                "dbdriver": "mysqli", "host": "localhost", "port": 3306,
                "username": "root", "password": "", "database": "app_pipeline_test"
            }
        }))
        .unwrap();
        let mut config = common::config::AppConfig::load_with_service("test");
        config.app_env = AppEnv::Development;
        let connectors = DefaultConnectors::from_config(&config);

        let first = InitializationPipeline::new(settings(dir.path(), "primary"), crate::models::registry())
            .with_configs(configs.clone())
            .run(&connectors)
            .await
            .unwrap();
        assert_eq!(first.registered_models, vec!["users", "sessions", "audit_log"]);
        assert!(first.schema_initialized);
        let recorded = std::fs::read_to_string(dir.path().join("init_state.json")).unwrap();

        let second = InitializationPipeline::new(settings(dir.path(), "primary"), crate::models::registry())
            .with_configs(configs)
            .run(&connectors)
            .await
            .unwrap();
        assert!(!second.schema_initialized);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("init_state.json")).unwrap(),
            recorded
        );
    }
}
