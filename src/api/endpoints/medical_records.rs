//! Medical record endpoints.
//!
//! - `GET /api/medical-records?search=`: role-scoped list
//! - `POST /api/medical-records`: doctors add a record for a treated patient

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use crate::access::ScopedStore;
use crate::api::endpoints::{open_viewer, MutationResponse, SearchQuery};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::models::NewMedicalRecord;
use crate::pages::MedicalRecordsPage;

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    let page = MedicalRecordsPage::load(&store)?;
    Ok(Json(page.view(&query.search)).into_response())
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Query(query): Query<SearchQuery>,
    Json(form): Json<NewMedicalRecord>,
) -> Result<Response, ApiError> {
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    let mut page = MedicalRecordsPage::load(&store)?;
    let outcome = page.create(&store, form)?;
    let body = MutationResponse {
        outcome,
        page: page.view(&query.search),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}
