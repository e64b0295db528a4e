//! Resolves the active database configuration by symbolic name.

use std::collections::HashMap;
use std::path::Path;

use common::errors::{AppError, AppResult};
use common::models::{DatabaseConfig, DriverKind};
use serde::Deserialize;

/// Raw configuration entries keyed by symbolic name. Entries are only
/// parsed when resolved, so a broken record never blocks its siblings.
pub type ConfigEntries = HashMap<String, serde_json::Value>;

/// A configuration record paired with the backend it selects.
#[derive(Debug, Clone)]
pub struct ResolvedDatabase {
    /// Symbolic name the record was looked up by.
    pub name: String,
    pub kind: DriverKind,
    pub config: DatabaseConfig,
}

/// Looks up named database configurations.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    entries: ConfigEntries,
}

impl ConfigResolver {
    pub fn new(entries: ConfigEntries) -> Self {
        Self { entries }
    }

    /// Loads the JSON mapping of name to configuration from `path`.
    pub async fn from_file(path: &Path) -> AppResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let entries: ConfigEntries = serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), count = entries.len(), "Database configurations loaded");
        Ok(Self::new(entries))
    }

    /// Resolves `name` to its validated record and driver kind.
    pub fn resolve(&self, name: &str) -> AppResult<ResolvedDatabase> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| AppError::ConfigNotFound(name.to_string()))?;
        let config = DatabaseConfig::deserialize(entry)
            .map_err(|e| AppError::Config(format!("invalid configuration {name:?}: {e}")))?;
        config.check()?;
        let kind = DriverKind::detect(&config.dbdriver)?;
        config.check_database(kind)?;

        Ok(ResolvedDatabase {
            name: name.to_string(),
            kind,
            config,
        })
    }
}
