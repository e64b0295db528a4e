//! Database configuration models.
//!
//! A [`DatabaseConfig`] is one named entry of the database configuration
//! file; [`DriverKind`] is the backend it resolves to.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Storage backend family selected by the `dbdriver` string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// MongoDB document store.
    Document,
    /// Redis ordered-key store.
    OrderedKey,
    /// MySQL, spelled `mysql` or `mysqli`.
    Relational,
}

impl DriverKind {
    /// Detects the backend from a free-text driver name.
    ///
    /// Matching is case-insensitive and checked in priority order:
    /// document store, ordered-key store, relational.
    pub fn detect(dbdriver: &str) -> AppResult<Self> {
        let driver = dbdriver.to_lowercase();
        if driver.contains("mongo") {
            Ok(DriverKind::Document)
        } else if driver.contains("redis") {
            Ok(DriverKind::OrderedKey)
        } else if driver.contains("mysql") {
            Ok(DriverKind::Relational)
        } else {
            Err(AppError::UnsupportedDriver(dbdriver.to_string()))
        }
    }

    /// Whether the backend needs a non-empty database name. Redis treats an
    /// empty name as database index 0.
    pub fn requires_database_name(&self) -> bool {
        !matches!(self, DriverKind::OrderedKey)
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Document => write!(f, "mongodb"),
            DriverKind::OrderedKey => write!(f, "redis"),
            DriverKind::Relational => write!(f, "mysql"),
        }
    }
}

/// One named database configuration record.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Free-text driver name (e.g. `mysqli`, `MongoDB`, `redis`).
    #[validate(length(min = 1, message = "dbdriver is required"))]
    pub dbdriver: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    /// Never serialized back out.
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Database name; for Redis, the numeric database index.
    #[serde(default)]
    pub database: String,
    /// Full connection string; takes precedence over discrete fields when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,
    /// Prefix prepended to every registered model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbprefix: Option<String>,
}

impl DatabaseConfig {
    /// The connection string, if one is set and non-empty.
    pub fn dsn(&self) -> Option<&str> {
        self.dsn.as_deref().filter(|d| !d.trim().is_empty())
    }

    /// The table-name prefix, empty when unset.
    pub fn prefix(&self) -> &str {
        self.dbprefix.as_deref().unwrap_or("")
    }

    /// Runs field validation, mapping failures to [`AppError::Validation`].
    pub fn check(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))
    }

    /// Checks the database name against what the backend of `kind` needs.
    pub fn check_database(&self, kind: DriverKind) -> AppResult<()> {
        if kind.requires_database_name() && self.database.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "database: database is required for {kind}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dbdriver", &self.dbdriver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("dsn", &self.dsn.as_ref().map(|_| "***"))
            .field("dbprefix", &self.dbprefix)
            .finish()
    }
}
