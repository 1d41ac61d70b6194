//! Health endpoint handler.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns service identity, uptime and the configured request timeout as
/// JSON.
///
/// The health path is ignored by the boundary layer by default, so health checks
/// get a request context but no span and no log entry.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let telemetry = &state.telemetry;
    let timeout_ms = u64::try_from(state.config.request_timeout.as_millis()).unwrap_or(u64::MAX);
    Json(json!({
        "status": "ok",
        "service": telemetry.tracer().service_name(),
        "hostname": telemetry.logger().hostname(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "request_timeout_ms": timeout_ms,
    }))
}
