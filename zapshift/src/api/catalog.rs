//! Reference data endpoints:
//! - GET /reviews
//! - GET /services
//! - GET /division, /divisions
//! - GET /ware-houses - active warehouses without internal fields
//! - GET /branches - active warehouses as `{region, district}`

#![allow(clippy::missing_errors_doc)]

use super::read_or_empty;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use zapshift_core::catalog::{Branch, Division, Review, Service, WarehouseView};
use zapshift_web::WebResult;

/// GET /reviews
pub async fn list_reviews(State(state): State<AppState>) -> WebResult<Json<Vec<Review>>> {
    let reviews = state.catalog.reviews().await;
    read_or_empty(&state, "reviews", reviews).map(Json)
}

/// GET /services
pub async fn list_services(State(state): State<AppState>) -> WebResult<Json<Vec<Service>>> {
    let services = state.catalog.services().await;
    read_or_empty(&state, "services", services).map(Json)
}

/// GET /division
pub async fn list_divisions(State(state): State<AppState>) -> WebResult<Json<Vec<Division>>> {
    let divisions = state.catalog.divisions().await;
    read_or_empty(&state, "divisions", divisions).map(Json)
}

/// GET /ware-houses
pub async fn list_warehouses(
    State(state): State<AppState>,
) -> WebResult<Json<Vec<WarehouseView>>> {
    let warehouses = state.catalog.warehouses().await;
    read_or_empty(&state, "ware-houses", warehouses).map(Json)
}

/// GET /branches
pub async fn list_branches(State(state): State<AppState>) -> WebResult<Json<Vec<Branch>>> {
    let branches = state.catalog.branches().await;
    read_or_empty(&state, "branches", branches).map(Json)
}
