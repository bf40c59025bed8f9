//! HTTP API over the capture buffer
//!
//! Routes:
//!
//! - `GET  /api/entries`    - every held record, newest first
//! - `GET  /api/entry/:id`  - one record, 404 if absent or unparseable
//! - `POST /api/clear`      - discard all records, 405 for any other verb
//! - `GET  /api/stats`      - method/status/host counts over one snapshot
//! - `GET  /health`, `GET /metrics`, `GET /`

use crate::buffer::CaptureBuffer;
use crate::error::MonitorError;
use crate::metrics::MetricsSnapshot;
use crate::query::TrafficQuery;
use crate::record::TrafficRecord;
use crate::stats::TrafficStats;
use axum::{
    extract::{Path, State},
    http::{Method, Uri},
    response::Json,
    routing::{any, get},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    query: TrafficQuery,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Response for the root endpoint
#[derive(Serialize)]
pub struct WelcomeResponse {
    pub service: String,
    pub version: String,
    pub endpoints: Vec<EndpointInfo>,
}

/// Information about available endpoints
#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

/// Build the monitor router around a shared buffer handle
pub fn router(buffer: Arc<CaptureBuffer>) -> Router {
    let state = ApiState {
        query: TrafficQuery::new(buffer),
    };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/entries", get(list_entries_handler))
        .route("/api/entry/:id", get(get_entry_handler))
        // every verb reaches the handler so the query layer can refuse non-POST
        .route("/api/clear", any(clear_handler))
        .route("/api/stats", get(stats_handler))
        .fallback(fallback_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root_handler() -> Json<WelcomeResponse> {
    let endpoint = |method: &str, path: &str, description: &str| EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    };

    Json(WelcomeResponse {
        service: "traffic-monitor".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: vec![
            endpoint("GET", "/api/entries", "Captured traffic, newest first"),
            endpoint("GET", "/api/entry/{id}", "A single captured exchange"),
            endpoint("POST", "/api/clear", "Discard all captured traffic"),
            endpoint("GET", "/api/stats", "Counts by method, status code and host"),
            endpoint("GET", "/health", "Basic health check"),
            endpoint("GET", "/metrics", "Capture buffer counters"),
        ],
    })
}

async fn health_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

async fn metrics_handler(State(state): State<ApiState>) -> Json<MetricsSnapshot> {
    Json(state.query.buffer().metrics_snapshot())
}

async fn list_entries_handler(State(state): State<ApiState>) -> Json<Vec<TrafficRecord>> {
    Json(state.query.list_all())
}

async fn get_entry_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<TrafficRecord>, MonitorError> {
    state.query.get_one(&id).map(Json)
}

async fn clear_handler(
    State(state): State<ApiState>,
    method: Method,
) -> Result<Json<StatusResponse>, MonitorError> {
    let cleared = state.query.clear(&method)?;
    info!("Cleared {} records via API", cleared);
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

async fn stats_handler(State(state): State<ApiState>) -> Json<TrafficStats> {
    Json(state.query.stats())
}

async fn fallback_handler(uri: Uri) -> MonitorError {
    MonitorError::NotFound(uri.path().to_string())
}
