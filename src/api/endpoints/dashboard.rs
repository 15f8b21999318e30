//! `GET /api/dashboard`: per-role counters and upcoming visits.

use axum::extract::State;
use axum::{Extension, Json};

use crate::access::ScopedStore;
use crate::api::endpoints::open_viewer;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::pages::DashboardPage;

pub async fn dashboard(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
) -> Result<Json<DashboardPage>, ApiError> {
    let (conn, viewer) = open_viewer(&ctx, &auth)?;
    let store = ScopedStore::new(&conn, viewer);
    Ok(Json(DashboardPage::load(&store)?))
}
