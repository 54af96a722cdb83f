//! Axum integration for the ZapShift delivery API.
//!
//! This crate holds the HTTP plumbing that is independent of any one route:
//!
//! - [`AppError`]: maps [`zapshift_core::Error`] onto status codes and a
//!   `{code, message}` JSON body
//! - extractors for the correlation id and the caller's `Origin`
//! - the correlation-id middleware
//! - liveness / readiness handlers
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract** query, path and JSON input into explicit structs
//! 3. **Call** a service in the `zapshift` crate
//! 4. **Map** `zapshift_core::Error` to [`AppError`] with `?`
//! 5. **Serialize** the result
//!
//! # Example
//!
//! ```ignore
//! use zapshift_web::{AppError, WebResult};
//!
//! async fn track(
//!     State(state): State<AppState>,
//!     Path(id): Path<String>,
//! ) -> WebResult<Json<Parcel>> {
//!     Ok(Json(state.parcels.track(&ParcelId::new(id)).await?))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CorrelationId, RequestOrigin};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
