//! `GET /api/navigate?path=`: route guard for the client router.

use axum::extract::Query;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::types::SessionContext;
use crate::navigation::{self, menu_for, MenuItem, Navigation};

#[derive(Deserialize)]
pub struct NavigateQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Serialize)]
pub struct NavigateResponse {
    #[serde(flatten)]
    pub navigation: Navigation,
    /// Empty for anonymous callers.
    pub menu: Vec<MenuItem>,
}

pub async fn navigate(
    auth: Option<Extension<SessionContext>>,
    Query(query): Query<NavigateQuery>,
) -> Json<NavigateResponse> {
    let session = auth.as_ref().map(|Extension(a)| &a.session);
    Json(NavigateResponse {
        navigation: navigation::resolve(&query.path, session),
        menu: session.map(|s| menu_for(s.role())).unwrap_or_default(),
    })
}
