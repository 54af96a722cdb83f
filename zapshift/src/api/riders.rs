//! Rider application endpoints:
//! - POST /rider-request - submit an application
//! - PATCH /rider-requests-status - approve or reject
//! - GET /find-employees - filtered, paginated listing

#![allow(clippy::missing_errors_doc)]

use super::{body, query, read_or_empty};
use crate::server::state::AppState;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use zapshift_core::rider::{ApplicationForm, EmployeeFilter};
use zapshift_core::{ApplicationId, ApplicationStatus, Decision, Page, Paged, RiderApplication, Role};
use zapshift_web::WebResult;

/// Body of `PATCH /rider-requests-status`.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// Application id
    pub id: String,
    /// `approved` or `rejected`
    pub status: Decision,
}

/// Query of `GET /find-employees`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQuery {
    /// Requested role
    pub requested_role: Option<Role>,
    /// Application status
    pub status: Option<ApplicationStatus>,
    /// Granted role
    pub role: Option<Role>,
    /// Page size
    pub limit: Option<u32>,
    /// Items to skip
    pub skip: Option<u64>,
}

/// POST /rider-request
pub async fn submit_application(
    State(state): State<AppState>,
    form: Result<Json<ApplicationForm>, JsonRejection>,
) -> WebResult<(StatusCode, Json<RiderApplication>)> {
    let application = state.riders.submit(body(form)?).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// PATCH /rider-requests-status
pub async fn decide_application(
    State(state): State<AppState>,
    request: Result<Json<DecisionRequest>, JsonRejection>,
) -> WebResult<Json<RiderApplication>> {
    let request = body(request)?;
    let updated = state
        .riders
        .decide(&ApplicationId::new(request.id), request.status)
        .await?;
    Ok(Json(updated))
}

/// GET /find-employees?requestedRole=&status=&role=&limit=&skip=
pub async fn find_employees(
    State(state): State<AppState>,
    params: Result<Query<EmployeeQuery>, QueryRejection>,
) -> WebResult<Json<Paged<RiderApplication>>> {
    let params = query(params)?;
    let filter = EmployeeFilter {
        requested_role: params.requested_role,
        status: params.status,
        role: params.role,
    };
    let employees = state
        .riders
        .find(&filter, Page::new(params.limit, params.skip))
        .await;
    read_or_empty(&state, "find-employees", employees).map(Json)
}
