//! API endpoint handlers.
//!
//! Each module corresponds to a portal page or feature. Handlers open a
//! connection, wrap it in a `ScopedStore` for the calling viewer, and
//! delegate to the page view-models.

pub mod appointments;
pub mod auth;
pub mod dashboard;
pub mod doctors;
pub mod health;
pub mod medical_records;
pub mod navigation;
pub mod patients;
pub mod profile;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::authorization::Viewer;
use crate::pages::{ListView, MutationOutcome};

/// `?search=` query shared by the list pages.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

/// A successful write plus the re-fetched page.
#[derive(Serialize)]
pub struct MutationResponse<'a, T, R> {
    #[serde(flatten)]
    pub outcome: MutationOutcome<T>,
    pub page: ListView<'a, R>,
}

/// Open a connection and resolve the caller's directory rows.
pub(crate) fn open_viewer(
    ctx: &ApiContext,
    auth: &SessionContext,
) -> Result<(Connection, Viewer), ApiError> {
    let conn = ctx.core.open_db()?;
    let viewer = Viewer::resolve(&conn, &auth.session)?;
    Ok((conn, viewer))
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid id '{raw}'")))
}
