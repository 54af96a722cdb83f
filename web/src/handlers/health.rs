//! Health check endpoints.
//!
//! Liveness never touches dependencies. Readiness is computed by the server
//! (it owns the store) and rendered here so every service reports the same
//! shape.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Health report body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// `ok` or `unavailable`.
    pub status: &'static str,
    /// Crate version of the running binary.
    pub version: &'static str,
    /// Failure detail for readiness checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness endpoint.
///
/// ```text
/// GET /health  →  200 {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        message: None,
    })
}

/// Renders the outcome of a dependency probe: 200 when it succeeded,
/// 503 with the failure message otherwise.
#[must_use]
pub fn readiness<E: std::fmt::Display>(probe: Result<(), E>) -> (StatusCode, Json<HealthReport>) {
    match probe {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthReport {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                message: None,
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport {
                    status: "unavailable",
                    version: env!("CARGO_PKG_VERSION"),
                    message: Some(err.to_string()),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let Json(report) = health_check().await;
        assert_eq!(report.status, "ok");
    }

    #[test]
    fn test_readiness_reports_failure() {
        let (status, Json(report)) = readiness(Err("mongodb ping timed out"));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, "unavailable");
        assert_eq!(report.message.as_deref(), Some("mongodb ping timed out"));

        let (status, _) = readiness::<&str>(Ok(()));
        assert_eq!(status, StatusCode::OK);
    }
}
