//! Application error types.
//!
//! Every startup stage and HTTP handler reports failures through [`AppError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// The active database name has no configuration record.
    #[error("database configuration not found: {0}")]
    ConfigNotFound(String),

    /// The configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// The driver string matches none of the known backends.
    #[error("unsupported database driver: {0}")]
    UnsupportedDriver(String),

    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    #[error("redis connection failed: {0}")]
    RedisConnection(String),

    #[error("mongodb connection failed: {0}")]
    MongoConnection(String),

    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    #[error("redis operation failed: {0}")]
    RedisOperation(String),

    /// Schema synchronization did not complete.
    #[error("schema synchronization failed: {0}")]
    SchemaSync(String),

    /// The initialization state record could not be read or written.
    #[error("init state error: {0}")]
    StateStore(String),

    /// The database pipeline is disabled for this process.
    #[error("database is not enabled")]
    DatabaseUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnsupportedDriver(_) => "UNSUPPORTED_DRIVER",
            AppError::DatabaseConnection(_)
            | AppError::RedisConnection(_)
            | AppError::MongoConnection(_) => "CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            AppError::RedisOperation(_) => "REDIS_OPERATION_ERROR",
            AppError::SchemaSync(_) => "SYNC_ERROR",
            AppError::StateStore(_) => "STATE_STORE_ERROR",
            AppError::DatabaseUnavailable => "DATABASE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ConfigNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::UnsupportedDriver(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseConnection(_)
            | AppError::RedisConnection(_)
            | AppError::MongoConnection(_)
            | AppError::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
