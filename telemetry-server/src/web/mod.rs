//! Web server: axum REST API over the live telemetry registry.
//!
//! Shared state is the registry itself plus the optional webhook and ingest
//! token. The registry does its own locking, so handlers share it by `Arc`.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use telemetry_core::{TelemetryError, TelemetryRegistry};

use crate::notification::WebhookDispatcher;
use crate::sweeper::spawn_sweeper;

pub mod ingest;
pub mod routes;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub registry: Arc<TelemetryRegistry>,
    pub webhook: Option<WebhookDispatcher>,
    pub auth_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Maps core errors onto HTTP status codes.
pub struct ApiError(pub TelemetryError);

impl From<TelemetryError> for ApiError {
    fn from(e: TelemetryError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TelemetryError::InvalidLocatorFormat { .. }
            | TelemetryError::InvalidLocatorCharacter { .. }
            | TelemetryError::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            TelemetryError::IllegalDeletion(_) => StatusCode::FORBIDDEN,
            TelemetryError::Io(_) | TelemetryError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/objects", axum::routing::get(routes::api_objects))
        .route(
            "/api/objects/:id",
            axum::routing::get(routes::api_object_detail).delete(routes::api_object_delete),
        )
        .route(
            "/api/telemetry",
            axum::routing::delete(routes::api_root_delete),
        )
        .route("/api/stats", axum::routing::get(routes::api_stats))
        .route(
            "/api/locator/:grid",
            axum::routing::get(routes::api_locator),
        )
        // Ingest API (decoder feeders)
        .route(
            "/api/v1/messages",
            axum::routing::post(ingest::api_ingest_messages),
        )
        .with_state(state)
        .layer(cors)
}

/// Start the web server and the expiry sweeper; runs until ctrl-c.
pub async fn serve(
    state: Arc<AppState>,
    host: String,
    port: u16,
    sweep_interval: Duration,
) -> std::io::Result<()> {
    let sweeper = spawn_sweeper(
        Arc::clone(&state.registry),
        sweep_interval,
        state.webhook.clone(),
    );

    let app = build_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "telemetry server listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await;

    sweeper.abort();
    result
}
