//! Payment endpoints:
//! - POST /create-checkout-session - open a hosted checkout page
//! - PATCH /update-paymentStatus - reconcile a finished session
//!
//! # Payment Flow
//!
//! 1. **Checkout**: the client posts a parcel id; the caller's `Origin` must
//!    be allow-listed, and the provider returns a hosted checkout URL
//! 2. **Redirect**: the provider sends the payer back to
//!    `{origin}/dashboard/payment-success?session_id=...`
//! 3. **Reconcile**: the client patches the session id; the server reads
//!    the session from the provider and settles the parcel exactly once

#![allow(clippy::missing_errors_doc)]

use super::{body, query};
use crate::server::state::AppState;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use zapshift_core::checkout::SettlementReceipt;
use zapshift_core::ParcelId;
use zapshift_web::{AppError, CorrelationId, RequestOrigin, WebResult};

/// Body of `POST /create-checkout-session`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestBody {
    /// Parcel to pay for
    pub parcel_id: String,
}

/// Response of `POST /create-checkout-session`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted checkout URL
    pub url: String,
}

/// Query of `PATCH /update-paymentStatus`.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    /// Provider session id
    pub session_id: Option<String>,
}

/// Optional body of `PATCH /update-paymentStatus`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
    /// Provider session id
    pub session_id: Option<String>,
}

/// POST /create-checkout-session
pub async fn create_checkout_session(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    origin: RequestOrigin,
    request: Result<Json<CheckoutRequestBody>, JsonRejection>,
) -> WebResult<Json<CheckoutResponse>> {
    let request = body(request)?;
    tracing::debug!(
        correlation_id = %correlation_id,
        parcel_id = %request.parcel_id,
        origin = ?origin.as_deref(),
        "Checkout requested"
    );

    let session = state
        .checkout
        .create_session(&ParcelId::new(request.parcel_id), origin.as_deref())
        .await?;
    Ok(Json(CheckoutResponse { url: session.url }))
}

/// PATCH /update-paymentStatus?session_id=
///
/// The session id may also arrive as a JSON body `{"sessionId": "..."}`.
pub async fn update_payment_status(
    State(state): State<AppState>,
    params: Result<Query<SessionQuery>, QueryRejection>,
    session_body: Option<Json<SessionBody>>,
) -> WebResult<Json<SettlementReceipt>> {
    let from_query = query(params)?.session_id;
    let from_body = session_body.and_then(|Json(b)| b.session_id);
    let session_id = from_query
        .or(from_body)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::validation("session_id is required"))?;

    let receipt = state.checkout.reconcile(&session_id).await?;
    Ok(Json(receipt))
}
