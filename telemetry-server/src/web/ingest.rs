//! Decoder ingest API: feeders POST batches of raw decoder lines here.
//!
//! Each batch names its line format (`wsprd` or `rtl433`). Lines may carry a
//! `;<timestamp>` suffix; otherwise the batch timestamp, then server time, is
//! used.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use telemetry_core::{MessageFormat, ObjectEvent};

use crate::input::clean_line;
use crate::sweeper::now;
use crate::web::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct IngestRequest {
    format: MessageFormat,
    lines: Vec<String>,
    timestamp: Option<f64>,
}

// ---------------------------------------------------------------------------
// Auth helper
// ---------------------------------------------------------------------------

/// Validate bearer token if auth is configured. Returns Err response on failure.
fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = match &state.auth_token {
        Some(t) => t,
        None => return Ok(()),
    };

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Some(token) = auth_header.strip_prefix("Bearer ") {
        if token == expected {
            return Ok(());
        }
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "invalid or missing bearer token"})),
    ))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/messages
pub async fn api_ingest_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<IngestRequest>,
) -> impl IntoResponse {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp.into_response();
    }

    let batch_ts = req.timestamp.unwrap_or_else(now);
    let mut accepted = 0u64;
    let mut rejected = 0u64;
    let mut created = 0u64;
    let mut errors: Vec<Value> = Vec::new();

    for (index, raw) in req.lines.iter().enumerate() {
        let Some((payload, ts)) = clean_line(raw) else {
            continue;
        };
        let result = req
            .format
            .parse_line(payload, ts.unwrap_or(batch_ts))
            .and_then(|msg| state.registry.receive(&msg));

        match result {
            Ok(event) => {
                accepted += 1;
                if matches!(event, ObjectEvent::Created { .. }) {
                    created += 1;
                    if let Some(wh) = &state.webhook {
                        wh.notify(&event);
                    }
                }
            }
            Err(e) => {
                rejected += 1;
                errors.push(json!({"line": index, "error": e.to_string()}));
            }
        }
    }

    debug!(format = %req.format, accepted, rejected, created, "ingested batch");

    Json(json!({
        "accepted": accepted,
        "rejected": rejected,
        "created": created,
        "errors": errors,
    }))
    .into_response()
}
