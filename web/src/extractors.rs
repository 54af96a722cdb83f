//! Custom Axum extractors.
//!
//! - `CorrelationId`: the id assigned by the correlation middleware, or one
//!   read from the `X-Correlation-ID` header, or a fresh one
//! - `RequestOrigin`: the caller's `Origin` header, used to allow-list
//!   checkout redirects
//!
//! # Examples
//!
//! ```ignore
//! use zapshift_web::extractors::{CorrelationId, RequestOrigin};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     origin: RequestOrigin,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id, origin = ?origin.0, "Creating session");
//!     Ok(Json(response))
//! }
//! ```

use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::fmt;
use uuid::Uuid;

/// Longest client-supplied correlation id that is accepted as-is.
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Correlation ID for request tracing.
///
/// Client-supplied ids are accepted when they are short printable ASCII;
/// anything else is replaced by a UUID v4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Accepts a client-supplied id or generates a new one.
    #[must_use]
    pub fn from_header_value(value: Option<&str>) -> Self {
        value
            .map(str::trim)
            .filter(|v| is_acceptable(v))
            .map_or_else(Self::generate, |v| Self(v.to_string()))
    }

    /// Generates a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_acceptable(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_CORRELATION_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic())
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(id.clone());
        }
        let header = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok());
        Ok(Self::from_header_value(header))
    }
}

/// Value of the `Origin` request header, if any.
///
/// A trailing slash is stripped so `https://app.example.com/` and
/// `https://app.example.com` compare equal against the allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin(pub Option<String>);

impl RequestOrigin {
    /// Returns the origin when present.
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let origin = parts
            .headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty() && v != "null");

        Ok(Self(origin))
    }
}
