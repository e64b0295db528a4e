//! Application service
//!
//! Boots the web application:
//! - loads `.env` and environment configuration
//! - runs the database initialization pipeline, exiting on failure
//! - serves the HTTP API backed by the startup result

mod connector;
mod engine;
mod handlers;
mod init_state;
mod models;
mod pipeline;
mod registrar;
mod resolver;
mod routes;
mod state;

use axum::{routing::get, Json, Router};
use common::config::AppConfig;
use connector::DefaultConnectors;
use pipeline::InitializationPipeline;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "app-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Application API",
        version = "0.1.0",
        description = "Web application bootstrap"
    ),
    paths(
        handlers::health_check,
        handlers::database_info,
    ),
    components(schemas(
        handlers::HealthResponse,
        handlers::DatabaseInfo,
        pipeline::PipelineStage,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "database", description = "Active database endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    load_dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::load_with_service(SERVICE_NAME);

    let pipeline = InitializationPipeline::new(config.database.clone(), models::registry());
    let startup = match pipeline.run(&DefaultConnectors::from_config(&config)).await {
        Ok(startup) => startup,
        Err(e) => {
            tracing::error!(error = %e, "Startup aborted");
            std::process::exit(1);
        }
    };

    let state = AppState::new(config.clone(), startup);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "Starting service");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Parses `KEY = VALUE` lines, skipping blanks and `#` comments.
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Load .env file from the working directory (best-effort, no error if missing).
/// Variables already set in the environment win.
fn load_dotenv() {
    let Ok(content) = std::fs::read_to_string(".env") else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(&key).is_err() {
            std::env::set_var(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use common::config::DatabaseSettings;
    use crate::pipeline::StartupResult;
    use tower::ServiceExt;

    fn disabled_state() -> AppState {
        let mut config = AppConfig::load_with_service(SERVICE_NAME);
        config.database = DatabaseSettings::disabled();
        AppState::new(config, StartupResult::disabled())
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(disabled_state())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_disabled_database() {
        let (status, body) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "disabled");
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["pipeline"], "ready");
    }

    #[tokio::test]
    async fn test_database_endpoint_unavailable_when_disabled() {
        let (status, body) = get_json("/api/database").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "DATABASE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let (status, body) = get_json("/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/database"].is_object());
    }

    #[test]
    fn test_parse_dotenv() {
        let parsed = parse_dotenv(
            "# comment\nENABLE_DATABASE = YES\n\nACTIVE_DATABASE=\"primary\"\nINITIALIZE_DB = true\nnot a pair\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("ENABLE_DATABASE".to_string(), "YES".to_string()),
                ("ACTIVE_DATABASE".to_string(), "primary".to_string()),
                ("INITIALIZE_DB".to_string(), "true".to_string()),
            ]
        );
    }
}
