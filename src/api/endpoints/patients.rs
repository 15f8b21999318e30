//! Patient directory endpoints.
//!
//! - `GET /api/patients?search=`: role-scoped list
//! - `POST /api/patients`: admin provisioning (not supported)
//! - `PUT /api/patients/:id`: edit own demographics

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use crate::access::{DirectoryKind, ScopedStore};
use crate::api::endpoints::{open_viewer, parse_id, MutationResponse, SearchQuery};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::models::PatientUpdate;
use crate::pages::PatientsPage;

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    let page = PatientsPage::load(&store)?;
    Ok(Json(page.view(&query.search)).into_response())
}

/// Always fails: 403 for non-admins, 501 for admins.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    ScopedStore::new(&conn, viewer).provision_directory_entry(DirectoryKind::Patient)?;
    Ok(StatusCode::CREATED.into_response())
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
    Json(update): Json<PatientUpdate>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    let mut page = PatientsPage::load(&store)?;
    let outcome = page.update(&store, &id, update)?;
    Ok(Json(MutationResponse {
        outcome,
        page: page.view(&query.search),
    })
    .into_response())
}
