//! HTTP handlers, grouped by domain:
//! - Catalog: reviews, services, divisions, warehouses, branches
//! - Parcels: booking, tracking, listings, delivery reports
//! - Riders: applications and decisions
//! - Payments: checkout sessions and reconciliation
//!
//! Read endpoints go through [`read_or_empty`], so with fail-open reads
//! enabled a failing read answers with an empty body instead of an error.

pub mod catalog;
pub mod parcels;
pub mod payments;
pub mod riders;

use crate::metrics;
use crate::server::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use zapshift_core::Result;
use zapshift_web::{AppError, WebResult};

/// Resolves a read: the value, or the empty value when the read failed and
/// reads fail open.
pub(crate) fn read_or_empty<T: Default>(
    state: &AppState,
    endpoint: &'static str,
    result: Result<T>,
) -> WebResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if state.fail_open_reads => {
            tracing::warn!(endpoint, error = %err, "Read failed, answering with an empty result");
            metrics::record_read_fallback(endpoint);
            Ok(T::default())
        }
        Err(err) => Err(err.into()),
    }
}

/// Unwraps a query extractor, rendering rejections as JSON errors.
pub(crate) fn query<T>(query: std::result::Result<Query<T>, QueryRejection>) -> WebResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// Unwraps a JSON body extractor, rendering rejections as JSON errors.
pub(crate) fn body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> WebResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}
