//! Error types for web handlers.
//!
//! [`AppError`] bridges domain errors and HTTP responses. Every
//! [`zapshift_core::Error`] variant maps to exactly one status code and a
//! stable machine-readable `code`; the body is always `{code, message}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use zapshift_core::Error;

/// Application error type for web handlers.
///
/// Server-side failures are logged when converted into a response; their
/// message is replaced by a generic one so internals never reach the client.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 402 Payment Required error.
    #[must_use]
    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYMENT_REQUIRED, "PAYMENT_NOT_COMPLETED", message)
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Create a 409 Conflict error with a specific code.
    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    /// Create a 502 Bad Gateway error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "BAD_GATEWAY", message)
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Validation(_) => Self::validation(message),
            Error::NotFound { .. } => Self::not_found(message),
            Error::DuplicateApplication { .. } => {
                Self::conflict("DUPLICATE_APPLICATION", message)
            }
            Error::AlreadySettled { .. } => Self::conflict("ALREADY_SETTLED", message),
            Error::PaymentNotCompleted { .. } => Self::payment_required(message),
            Error::SessionIncomplete { .. } => {
                Self::new(StatusCode::NOT_FOUND, "SESSION_INCOMPLETE", message)
            }
            Error::ForbiddenOrigin { .. } => Self::forbidden(message),
            Error::Store(_) => Self::internal("An internal error occurred")
                .with_source(anyhow::Error::new(err)),
            Error::PaymentProvider(_) => Self::bad_gateway("The payment provider is unavailable")
                .with_source(anyhow::Error::new(err)),
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (Error::validation("x"), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (Error::not_found("Parcel", "p"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                Error::DuplicateApplication { email: "a@b.c".into() },
                StatusCode::CONFLICT,
                "DUPLICATE_APPLICATION",
            ),
            (
                Error::AlreadySettled { parcel_id: "p".into() },
                StatusCode::CONFLICT,
                "ALREADY_SETTLED",
            ),
            (
                Error::PaymentNotCompleted { status: "unpaid".into() },
                StatusCode::PAYMENT_REQUIRED,
                "PAYMENT_NOT_COMPLETED",
            ),
            (
                Error::SessionIncomplete { session_id: "cs".into() },
                StatusCode::NOT_FOUND,
                "SESSION_INCOMPLETE",
            ),
            (
                Error::ForbiddenOrigin { origin: "x".into() },
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
            ),
            (Error::store("down"), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR"),
            (
                Error::PaymentProvider("503".into()),
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
            ),
        ];

        for (err, status, code) in cases {
            let app = AppError::from(err);
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[tokio::test]
    async fn server_errors_hide_internals() {
        let (status, body) = body_json(Error::store("connection refused at 10.0.0.3").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn client_errors_keep_message() {
        let (status, body) = body_json(Error::not_found("Parcel", "abc").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Parcel with id abc not found");
    }
}
