//! Persistent record of one-time schema initialization.
//!
//! A destructive sync runs only while this record says the schema has not
//! been initialized. The record lives apart from user-editable configuration
//! and is replaced atomically.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use common::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Contents of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitState {
    pub schema_initialized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialized_at: Option<DateTime<Utc>>,
    /// Symbolic name of the database that was initialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// File-backed store for [`InitState`].
#[derive(Debug, Clone)]
pub struct InitStateStore {
    path: PathBuf,
}

impl InitStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record; a missing file means nothing was initialized yet.
    /// Any other read failure is an error, never "not initialized".
    pub async fn load(&self) -> AppResult<InitState> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(InitState::default()),
            Err(e) => {
                return Err(AppError::StateStore(format!(
                    "failed to read state file {}: {e}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str(&contents)
            .map_err(|e| AppError::StateStore(format!("failed to parse state file: {e}")))
    }

    /// Records a completed initialization of `database`.
    ///
    /// Returns `false` without touching the file when the record already
    /// says initialized.
    pub async fn mark_initialized(&self, database: &str) -> AppResult<bool> {
        if self.load().await?.schema_initialized {
            return Ok(false);
        }

        let state = InitState {
            schema_initialized: true,
            initialized_at: Some(Utc::now()),
            database: Some(database.to_string()),
        };
        self.save(&state).await?;
        tracing::info!(path = %self.path.display(), database, "Schema initialization recorded");
        Ok(true)
    }

    async fn save(&self, state: &InitState) -> AppResult<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| AppError::StateStore(format!("failed to serialize state: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| AppError::StateStore(format!("failed to write state file: {e}")))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| AppError::StateStore(format!("failed to rename state file: {e}")))?;

        Ok(())
    }
}
