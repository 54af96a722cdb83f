//! Business metrics for the delivery API.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `zapshift_parcels_created_total` - Parcels booked
//! - `zapshift_payments_total{outcome}` - Reconciliations by outcome
//!   (settled, not_paid, incomplete, already_settled)
//! - `zapshift_checkout_sessions_total` - Checkout sessions opened
//! - `zapshift_rider_applications_total{outcome}` - Applications by outcome
//!   (submitted, reapplied, duplicate, approved, rejected)
//! - `zapshift_read_fallbacks_total{endpoint}` - Reads answered empty after an error

use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// Call once at start-up, before any metric is recorded.
pub fn register_business_metrics() {
    describe_counter!("zapshift_parcels_created_total", "Total number of parcels booked");
    describe_counter!(
        "zapshift_payments_total",
        "Payment reconciliations by outcome (settled, not_paid, incomplete, already_settled)"
    );
    describe_counter!(
        "zapshift_checkout_sessions_total",
        "Total number of checkout sessions opened with the payment provider"
    );
    describe_counter!(
        "zapshift_rider_applications_total",
        "Rider applications by outcome (submitted, reapplied, duplicate, approved, rejected)"
    );
    describe_counter!(
        "zapshift_read_fallbacks_total",
        "Read requests answered with an empty result after an error"
    );

    tracing::info!("Business metrics registered");
}

/// Record a booked parcel.
pub fn record_parcel_created() {
    metrics::counter!("zapshift_parcels_created_total").increment(1);
}

/// Record the outcome of a payment reconciliation.
pub fn record_payment(outcome: &'static str) {
    metrics::counter!("zapshift_payments_total", "outcome" => outcome).increment(1);
}

/// Record an opened checkout session.
pub fn record_checkout_session() {
    metrics::counter!("zapshift_checkout_sessions_total").increment(1);
}

/// Record a rider-application event.
pub fn record_rider_application(outcome: &'static str) {
    metrics::counter!("zapshift_rider_applications_total", "outcome" => outcome).increment(1);
}

/// Record a fail-open read.
pub fn record_read_fallback(endpoint: &'static str) {
    metrics::counter!("zapshift_read_fallbacks_total", "endpoint" => endpoint).increment(1);
}
