//! Parcel endpoints:
//! - POST /create-parcel - book a parcel, priced server-side
//! - GET /track-parcel/:id - one parcel
//! - GET /parcel-data - a sender's parcels, paginated
//! - GET /track-deliveries - status counts and deliveries per day
//! - GET /rider-deliveries - deliveries per day for one rider

#![allow(clippy::missing_errors_doc)]

use super::{body, query, read_or_empty};
use crate::server::state::AppState;
use crate::services::DeliveryReport;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use zapshift_core::parcel::{DailyCount, ParcelFilter};
use zapshift_core::{Error, Page, Paged, Parcel, ParcelDraft, ParcelId, ParcelStatus};
use zapshift_web::WebResult;

/// Query of `GET /parcel-data`.
#[derive(Debug, Default, Deserialize)]
pub struct ParcelQuery {
    /// Creator or sender email
    pub email: Option<String>,
    /// Lifecycle status
    pub status: Option<ParcelStatus>,
    /// Page size
    pub limit: Option<u32>,
    /// Items to skip
    pub skip: Option<u64>,
}

/// Query of `GET /rider-deliveries`.
#[derive(Debug, Default, Deserialize)]
pub struct RiderQuery {
    /// Rider email
    pub email: Option<String>,
}

/// A tracked parcel; renders as `{}` when the lookup failed open.
#[derive(Debug, Default)]
pub struct TrackedParcel(Option<Box<Parcel>>);

impl Serialize for TrackedParcel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Some(parcel) => parcel.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /create-parcel
pub async fn create_parcel(
    State(state): State<AppState>,
    draft: Result<Json<ParcelDraft>, JsonRejection>,
) -> WebResult<(StatusCode, Json<Parcel>)> {
    let parcel = state.parcels.create(body(draft)?).await?;
    Ok((StatusCode::CREATED, Json(parcel)))
}

/// GET /track-parcel/:id
pub async fn track_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<TrackedParcel>> {
    let tracked = state
        .parcels
        .track(&ParcelId::new(id))
        .await
        .map(|parcel| TrackedParcel(Some(Box::new(parcel))));
    read_or_empty(&state, "track-parcel", tracked).map(Json)
}

/// GET /parcel-data?email=&status=&limit=&skip=
pub async fn list_parcels(
    State(state): State<AppState>,
    params: Result<Query<ParcelQuery>, QueryRejection>,
) -> WebResult<Json<Paged<Parcel>>> {
    let params = query(params)?;
    let filter = ParcelFilter {
        email: non_blank(params.email),
        status: params.status,
    };
    let page = Page::new(params.limit, params.skip);
    let parcels = state.parcels.list(&filter, page).await;
    read_or_empty(&state, "parcel-data", parcels).map(Json)
}

/// GET /track-deliveries
pub async fn track_deliveries(State(state): State<AppState>) -> WebResult<Json<DeliveryReport>> {
    let report = state.parcels.delivery_report().await;
    read_or_empty(&state, "track-deliveries", report).map(Json)
}

/// GET /rider-deliveries?email=
pub async fn rider_deliveries(
    State(state): State<AppState>,
    params: Result<Query<RiderQuery>, QueryRejection>,
) -> WebResult<Json<Vec<DailyCount>>> {
    let deliveries = match non_blank(query(params)?.email) {
        Some(email) => state.parcels.deliveries_by_day(Some(&email)).await,
        None => Err(Error::validation("email is required")),
    };
    read_or_empty(&state, "rider-deliveries", deliveries).map(Json)
}
