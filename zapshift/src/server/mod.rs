//! HTTP server module for the ZapShift API.
//!
//! This module provides the Axum-based HTTP server with:
//! - Application state management
//! - Health check endpoints
//! - Router configuration
//! - The middleware stack (CORS, request timeout, tracing, correlation ids)

pub mod health;
pub mod routes;
pub mod state;

pub use health::health_check;
pub use routes::build_router;
pub use state::AppState;

use crate::config::Config;
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use zapshift_web::correlation_id_layer;

/// Router plus the middleware stack, outermost first: correlation id,
/// trace, CORS, timeout.
pub fn app(state: AppState, config: &Config) -> Router {
    build_router(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout,
        )))
        .layer(cors(config))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}

/// Browsers may call from the checkout allow-list; with no list configured
/// any origin is accepted (checkout still rejects it).
fn cors(config: &Config) -> CorsLayer {
    let correlation_id = HeaderName::from_static("x-correlation-id");
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, correlation_id.clone()])
        .expose_headers([correlation_id]);

    let origins: Vec<HeaderValue> = config
        .checkout
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
