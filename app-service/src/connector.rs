//! Backend connectors.
//!
//! One [`DriverConnector`] per [`DriverKind`], chosen through a
//! [`ConnectorFactory`] so the pipeline never matches on driver strings.

use std::time::Duration;

use async_trait::async_trait;
use common::config::{AppConfig, AppEnv};
use common::errors::{AppError, AppResult};
use common::models::{DatabaseConfig, DriverKind};
use mongodb::bson::doc;
use redis::aio::ConnectionManager as RedisConnectionManager;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPoolOptions};
use sqlx::{ConnectOptions, Connection as _};
use tracing::log::LevelFilter;

use crate::engine::{quote_ident, QueryEngine};

/// A freshly established backend connection.
pub enum Connection {
    /// Connected MongoDB client; the database is selected during activation.
    Document(mongodb::Client),
    OrderedKey(RedisConnectionManager),
    Relational(QueryEngine),
}

/// Establishes a connection for one backend kind.
#[async_trait]
pub trait DriverConnector: Send + Sync {
    async fn connect(&self, config: &DatabaseConfig) -> AppResult<Connection>;
}

/// Supplies the connector for a driver kind.
pub trait ConnectorFactory: Send + Sync {
    fn connector(&self, kind: DriverKind) -> Box<dyn DriverConnector>;
}

/// Connectors backed by the real database drivers.
#[derive(Debug, Clone)]
pub struct DefaultConnectors {
    app_env: AppEnv,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl DefaultConnectors {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            app_env: config.app_env,
            max_connections: config.max_connections,
            acquire_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }
}

impl ConnectorFactory for DefaultConnectors {
    fn connector(&self, kind: DriverKind) -> Box<dyn DriverConnector> {
        match kind {
            DriverKind::Document => Box::new(MongoConnector),
            DriverKind::OrderedKey => Box::new(RedisConnector),
            DriverKind::Relational => Box::new(MySqlConnector {
                app_env: self.app_env,
                max_connections: self.max_connections,
                acquire_timeout: self.acquire_timeout,
            }),
        }
    }
}

// ============== Document store ==============

/// Connection URI for the document store: the DSN verbatim when present,
/// otherwise `mongodb://host:port`.
pub fn document_uri(config: &DatabaseConfig) -> String {
    match config.dsn() {
        Some(dsn) => dsn.to_string(),
        None => format!("mongodb://{}:{}", config.host, config.port),
    }
}

pub struct MongoConnector;

#[async_trait]
impl DriverConnector for MongoConnector {
    async fn connect(&self, config: &DatabaseConfig) -> AppResult<Connection> {
        let client = mongodb::Client::with_uri_str(document_uri(config))
            .await
            .map_err(|e| AppError::MongoConnection(e.to_string()))?;

        // The client connects lazily; ping so auth and network failures surface here.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::MongoConnection(e.to_string()))?;

        Ok(Connection::Document(client))
    }
}

// ============== Ordered-key store ==============

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Redis connection parameters. The logical database index comes from the
/// `database` field; empty selects database 0.
pub fn redis_connection_info(config: &DatabaseConfig) -> AppResult<ConnectionInfo> {
    let database = config.database.trim();
    let db = if database.is_empty() {
        0
    } else {
        database.parse::<i64>().map_err(|_| {
            AppError::Validation(format!(
                "redis database must be a numeric index, got {:?}",
                config.database
            ))
        })?
    };

    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            db,
            username: non_empty(&config.username),
            password: non_empty(&config.password),
            ..Default::default()
        },
    })
}

pub struct RedisConnector;

#[async_trait]
impl DriverConnector for RedisConnector {
    async fn connect(&self, config: &DatabaseConfig) -> AppResult<Connection> {
        let client = redis::Client::open(redis_connection_info(config)?)
            .map_err(|e| AppError::RedisConnection(e.to_string()))?;
        let manager = RedisConnectionManager::new(client)
            .await
            .map_err(|e| AppError::RedisConnection(e.to_string()))?;
        Ok(Connection::OrderedKey(manager))
    }
}

// ============== Relational ==============

pub fn create_database_statement(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", quote_ident(database))
}

/// Server-level options, without a database selected.
fn server_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
}

/// Statements are logged at `info` in development and not at all otherwise.
fn statement_logging(options: MySqlConnectOptions, app_env: AppEnv) -> MySqlConnectOptions {
    if app_env.is_development() {
        options.log_statements(LevelFilter::Info)
    } else {
        options.disable_statement_logging()
    }
}

pub struct MySqlConnector {
    app_env: AppEnv,
    max_connections: u32,
    acquire_timeout: Duration,
}

#[async_trait]
impl DriverConnector for MySqlConnector {
    async fn connect(&self, config: &DatabaseConfig) -> AppResult<Connection> {
        let server = server_options(config);

        let mut bootstrap = MySqlConnection::connect_with(&server)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        sqlx::query(&create_database_statement(&config.database))
            .execute(&mut bootstrap)
            .await
            .map_err(|e| AppError::DatabaseQuery(format!("failed to create database: {e}")))?;
        if let Err(e) = bootstrap.close().await {
            tracing::warn!(error = %e, "Bootstrap connection did not close cleanly");
        }

        let options = statement_logging(server.database(&config.database), self.app_env);

        let pool = MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        Ok(Connection::Relational(QueryEngine::new(pool)))
    }
}
