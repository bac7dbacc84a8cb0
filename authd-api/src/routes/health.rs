/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "cache": "connected"
/// }
/// ```
///
/// Answers `200` with `"degraded"` when a backend is down, so the process
/// itself stays observable.

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub cache: String,
}

fn describe(up: bool) -> String {
    if up { "connected" } else { "disconnected" }.to_string()
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.auth.health().await;

    Json(HealthResponse {
        status: if report.is_healthy() { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: describe(report.database),
        cache: describe(report.cache),
    })
}
