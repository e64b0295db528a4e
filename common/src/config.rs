//! Application configuration loaded from the environment.

use std::path::PathBuf;

use serde::Serialize;

use crate::utils::{env_or, env_parse_or, to_boolean};

/// Runtime mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    /// Parses `APP_ENV`; anything but `development` is treated as production.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            AppEnv::Development
        } else {
            AppEnv::Production
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, AppEnv::Development)
    }
}

/// Toggles that drive the database initialization pipeline.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// `ENABLE_DATABASE`; only the exact value `YES` enables the pipeline.
    pub enabled: bool,
    /// `ACTIVE_DATABASE`, the symbolic name looked up in the config file.
    pub active: String,
    /// `INITIALIZE_DB`, requests a destructive schema sync.
    pub initialize: bool,
    /// Path of the JSON file holding the named database configurations.
    pub config_path: PathBuf,
    /// Path of the record marking that schema initialization already ran.
    pub init_state_path: PathBuf,
}

impl DatabaseSettings {
    /// Loads database toggles from environment variables.
    pub fn load() -> Self {
        Self {
            enabled: std::env::var("ENABLE_DATABASE").map(|v| v == "YES").unwrap_or(false),
            active: env_or("ACTIVE_DATABASE", ""),
            initialize: std::env::var("INITIALIZE_DB")
                .map(|v| to_boolean(&v))
                .unwrap_or(false),
            config_path: PathBuf::from(env_or("DATABASE_CONFIG", "database.json")),
            init_state_path: PathBuf::from(env_or("INIT_STATE_PATH", ".init_state.json")),
        }
    }

    /// Settings with the pipeline switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            active: String::new(),
            initialize: false,
            config_path: PathBuf::from("database.json"),
            init_state_path: PathBuf::from(".init_state.json"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and responses.
    pub service: String,
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
    /// Development or production mode.
    pub app_env: AppEnv,
    /// Upper bound of the relational connection pool.
    pub max_connections: u32,
    /// Timeout applied when acquiring relational connections.
    pub connect_timeout_secs: u64,
    /// Database pipeline toggles.
    pub database: DatabaseSettings,
}

impl AppConfig {
    /// Loads configuration for the named service from environment variables.
    pub fn load_with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
            host: env_or("HTTP_HOST", "0.0.0.0"),
            port: env_parse_or("HTTP_PORT", 3000),
            app_env: AppEnv::parse(&env_or("APP_ENV", "production")),
            max_connections: env_parse_or("DB_MAX_CONNECTIONS", 10),
            connect_timeout_secs: env_parse_or("DB_CONNECT_TIMEOUT_SECS", 10),
            database: DatabaseSettings::load(),
        }
    }
}
