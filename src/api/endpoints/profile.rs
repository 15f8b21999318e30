//! Own profile endpoints.
//!
//! - `GET /api/profile`: profile plus the caller's patient or doctor row
//! - `PATCH /api/profile`: edit display name and phone
//! - `GET /api/profiles/:id`: another identity's display profile, when visible

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::access::ScopedStore;
use crate::api::endpoints::{open_viewer, parse_id};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::models::{Doctor, Patient, Profile, ProfileUpdate};

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Doctor>,
}

fn load(store: &ScopedStore<'_>) -> Result<ProfileResponse, ApiError> {
    let viewer = store.viewer();
    let patient = match viewer.patient_id {
        Some(id) => store.get_patient(&id)?,
        None => None,
    };
    let doctor = match viewer.doctor_id {
        Some(id) => store.get_doctor(&id)?,
        None => None,
    };
    Ok(ProfileResponse {
        profile: store.own_profile()?,
        patient,
        doctor,
    })
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    Ok(Json(load(&store)?))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    store.update_own_profile(update)?;
    Ok(Json(load(&store)?))
}

/// Invisible and missing profiles both read as 404.
pub async fn lookup(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let id = parse_id(&id)?;
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    ScopedStore::new(&conn, viewer)
        .get_profile(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("profile".into()))
}
