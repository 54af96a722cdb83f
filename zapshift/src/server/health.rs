//! Health check endpoints for the ZapShift server.
//!
//! - GET / - plain-text banner
//! - GET /health - liveness, never touches dependencies
//! - GET /ready - pings the document store; 503 when it does not answer

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use zapshift_web::handlers::{HealthReport, readiness};

pub use zapshift_web::handlers::health_check;

/// Plain-text banner on `/`.
#[allow(clippy::unused_async)]
pub async fn banner() -> &'static str {
    "ZapShift server is running"
}

/// Readiness check endpoint.
///
/// ```bash
/// curl http://localhost:2000/ready
/// # {"status":"ok","version":"0.1.0"}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    readiness(state.store_health.ping().await)
}
