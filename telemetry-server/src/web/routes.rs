//! REST API route handlers.
//!
//! Everything is served from the in-memory registry. Deletion endpoints
//! exist so external clients get an explicit refusal rather than a 405.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use telemetry_core::locator;

use crate::sweeper::now;
use crate::web::{ApiError, AppState};

// ---------------------------------------------------------------------------
// Query param types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ObjectParams {
    /// Include uninteresting objects and those whose expiry has passed but
    /// which the sweeper has not evicted yet.
    all: Option<bool>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/objects: interesting live objects, most recently heard first.
pub async fn api_objects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ObjectParams>,
) -> impl IntoResponse {
    let objects = if params.all.unwrap_or(false) {
        state.registry.list_objects()
    } else {
        let mut active = state.registry.list_active(now());
        active.retain(|obj| obj.interesting);
        active
    };
    Json(objects)
}

/// GET /api/objects/:id
pub async fn api_object_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&id) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("no telemetry object {id:?}")})),
        )
            .into_response(),
    }
}

/// DELETE /api/objects/:id: always refused.
pub async fn api_object_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.registry.request_deletion(Some(&id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/telemetry: deleting the registry itself, always refused.
pub async fn api_root_delete(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.registry.request_deletion(None)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/stats
pub async fn api_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.stats())
}

/// GET /api/locator/:grid: decode a Maidenhead locator.
pub async fn api_locator(Path(grid): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let cell = locator::cell(&grid)?;
    let (lat, lon) = cell.center();
    let (south, west) = cell.corner();
    Ok(Json(json!({
        "locator": grid.to_uppercase(),
        "latitude": lat,
        "longitude": lon,
        "south": south,
        "west": west,
        "lat_size": cell.lat_size,
        "lon_size": cell.lon_size,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use telemetry_core::rtl433::Rtl433Message;
    use telemetry_core::wspr::WsprSpot;
    use telemetry_core::{NullObserver, TelemetryMessage, TelemetryRegistry};

    fn test_state() -> Arc<AppState> {
        let registry = TelemetryRegistry::new(Arc::new(NullObserver));
        let t = now();

        let spot: TelemetryMessage = WsprSpot {
            call: Some("K1ABC".into()),
            grid: Some("FN42".into()),
            snr: Some(-12),
            ..WsprSpot::new(t)
        }
        .into();
        registry.receive(&spot).unwrap();

        let fields = serde_json::from_str(r#"{"model": "Acurite", "id": 7, "humidity": 41}"#)
            .unwrap();
        registry
            .receive(&Rtl433Message::new(fields, 0.0).into())
            .unwrap();

        Arc::new(AppState {
            registry: Arc::new(registry),
            webhook: None,
            auth_token: None,
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_objects_active_only() {
        let app = crate::web::build_router(test_state());

        let response = app.oneshot(get("/api/objects")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let arr = json.as_array().unwrap();
        // The rtl_433 group was heard at t=0 and has long expired.
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["id"], "wsprspot_K1ABC_FN42");
        assert_eq!(arr[0]["kind"], "wspr_station");
    }

    #[tokio::test]
    async fn test_api_objects_all() {
        let app = crate::web::build_router(test_state());

        let response = app.oneshot(get("/api/objects?all=true")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_api_object_detail() {
        let app = crate::web::build_router(test_state());

        let response = app.oneshot(get("/api/objects/7-Acurite")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["kind"], "rtl_433_device");
        assert!(json["fields"]
            .as_array()
            .unwrap()
            .iter()
            .any(|f| f["key"] == "humidity" && f["value"] == 41));
    }

    #[tokio::test]
    async fn test_api_object_not_found() {
        let app = crate::web::build_router(test_state());

        let response = app.oneshot(get("/api/objects/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_object_refused() {
        let state = test_state();
        let app = crate::web::build_router(Arc::clone(&state));

        let response = app
            .oneshot(delete("/api/objects/wsprspot_K1ABC_FN42"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("wsprspot_K1ABC_FN42"));
        assert!(state.registry.contains("wsprspot_K1ABC_FN42"));
    }

    #[tokio::test]
    async fn test_delete_root_refused() {
        let state = test_state();
        let app = crate::web::build_router(Arc::clone(&state));

        let response = app.oneshot(delete("/api/telemetry")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(state.registry.len(), 2);
    }

    #[tokio::test]
    async fn test_api_stats() {
        let app = crate::web::build_router(test_state());

        let response = app.oneshot(get("/api/stats")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["resident"], 2);
        assert_eq!(json["received"], 2);
        assert_eq!(json["created"], 2);
    }

    #[tokio::test]
    async fn test_api_locator() {
        let app = crate::web::build_router(test_state());

        let response = app.oneshot(get("/api/locator/fn20")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["locator"], "FN20");
        assert_eq!(json["latitude"], 40.5);
        assert_eq!(json["longitude"], -75.0);
        assert_eq!(json["south"], 40.0);
        assert_eq!(json["west"], -76.0);
    }

    #[tokio::test]
    async fn test_api_locator_invalid() {
        let app = crate::web::build_router(test_state());

        let response = app.oneshot(get("/api/locator/FN2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
