//! Appointment endpoints.
//!
//! - `GET /api/appointments?search=&status=`: role-scoped list
//! - `POST /api/appointments`: book (patient) or schedule (doctor)
//! - `PATCH /api/appointments/:id/status`: complete or cancel
//!
//! Writes accept the same `search`/`status` query as the list, so the
//! returned page keeps the caller's filters.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::access::ScopedStore;
use crate::api::endpoints::{open_viewer, parse_id, MutationResponse};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::models::{AppointmentStatus, NewAppointment};
use crate::pages::{AppointmentsPage, StatusFilter};

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
}

impl AppointmentQuery {
    fn status_filter(&self) -> Result<StatusFilter, ApiError> {
        StatusFilter::from_str(&self.status).map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Response, ApiError> {
    let status = query.status_filter()?;
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    let page = AppointmentsPage::load(&store)?;
    Ok(Json(page.view(&query.search, status)).into_response())
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Query(query): Query<AppointmentQuery>,
    Json(form): Json<NewAppointment>,
) -> Result<Response, ApiError> {
    let status = query.status_filter()?;
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    let mut page = AppointmentsPage::load(&store)?;
    let outcome = page.create(&store, form)?;
    let body = MutationResponse {
        outcome,
        page: page.view(&query.search, status),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn set_status(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Path(id): Path<String>,
    Query(query): Query<AppointmentQuery>,
    Json(change): Json<StatusChange>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let status = query.status_filter()?;
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    let mut page = AppointmentsPage::load(&store)?;
    let outcome = page.set_status(&store, &id, change.status)?;
    Ok(Json(MutationResponse {
        outcome,
        page: page.view(&query.search, status),
    })
    .into_response())
}
