//! HTTP handlers reading the startup result.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::response::ApiResponse;

use crate::pipeline::PipelineStage;
use crate::state::AppState;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.startup.database.is_some() {
        "ready"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        database: database.to_string(),
        pipeline: state.startup.stage,
    })
}

/// Active database details with a live ping
#[utoipa::path(
    get,
    path = "/api/database",
    tag = "database",
    responses(
        (status = 200, description = "Active database", body = ApiResponse<DatabaseInfo>),
        (status = 503, description = "Database disabled")
    )
)]
pub async fn database_info(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DatabaseInfo>>, AppError> {
    let active = state
        .startup
        .database
        .as_ref()
        .ok_or(AppError::DatabaseUnavailable)?;

    let (latency_ms, error) = match active.handle.ping().await {
        Ok(latency) => (Some(latency.as_millis() as u64), None),
        Err(e) => (None, Some(e.to_string())),
    };

    Ok(Json(ApiResponse::ok_with_service(
        DatabaseInfo {
            name: active.name.clone(),
            driver: active.kind.to_string(),
            database: active.config.database.clone(),
            registered_models: state.startup.registered_models.clone(),
            schema_initialized: state.startup.schema_initialized,
            reachable: error.is_none(),
            latency_ms,
            error,
        },
        state.config.service.clone(),
    )))
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// `ready` or `disabled`.
    pub database: String,
    pub pipeline: PipelineStage,
}

#[derive(Serialize, ToSchema)]
pub struct DatabaseInfo {
    /// Symbolic database name.
    pub name: String,
    pub driver: String,
    pub database: String,
    pub registered_models: Vec<String>,
    /// Whether this process ran the one-time destructive sync.
    pub schema_initialized: bool,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
