//! Router configuration for the ZapShift server.

use super::health::{banner, health_check, readiness_check};
use super::state::AppState;
use crate::api::{catalog, parcels, payments, riders};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Build the complete Axum router.
///
/// Paths are kept exactly as the web client calls them.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route("/", get(banner))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Reference data
        .route("/reviews", get(catalog::list_reviews))
        .route("/services", get(catalog::list_services))
        .route("/division", get(catalog::list_divisions))
        .route("/divisions", get(catalog::list_divisions))
        .route("/ware-houses", get(catalog::list_warehouses))
        .route("/branches", get(catalog::list_branches))
        // Parcels
        .route("/create-parcel", post(parcels::create_parcel))
        .route("/track-parcel/:id", get(parcels::track_parcel))
        .route("/parcel-data", get(parcels::list_parcels))
        .route("/track-deliveries", get(parcels::track_deliveries))
        .route("/rider-deliveries", get(parcels::rider_deliveries))
        // Rider applications
        .route("/rider-request", post(riders::submit_application))
        .route("/rider-requests-status", patch(riders::decide_application))
        .route("/find-employees", get(riders::find_employees))
        // Payments
        .route(
            "/create-checkout-session",
            post(payments::create_checkout_session),
        )
        .route("/update-paymentStatus", patch(payments::update_payment_status))
        .with_state(state)
}
