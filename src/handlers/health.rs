use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use std::time::Instant;

use crate::handlers::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

/// Individual component health details
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub sales_feed: ComponentHealth,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness plus a probe of the sales feed's item catalog
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let probe_start = Instant::now();
    let probe = tokio::time::timeout(
        state.forecasting.config().feed_timeout(),
        state.catalog.active_items(),
    )
    .await;
    let latency_ms = probe_start.elapsed().as_millis() as u64;

    let sales_feed = match probe {
        Ok(Ok(items)) => ComponentHealth {
            status: ComponentStatus::Up,
            message: format!("{} active items", items.len()),
            latency_ms: Some(latency_ms),
        },
        Ok(Err(err)) => ComponentHealth {
            status: ComponentStatus::Down,
            message: err.to_string(),
            latency_ms: Some(latency_ms),
        },
        Err(_) => ComponentHealth {
            status: ComponentStatus::Down,
            message: "Catalog probe timed out".to_string(),
            latency_ms: None,
        },
    };

    let status = sales_feed.status;
    let code = match status {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_secs: get_uptime_secs(),
            sales_feed,
        }),
    )
}
