//! Request audit trail.
//!
//! Innermost layer: by the time it runs, auth has attached the caller's
//! `SessionContext` (or left the request anonymous on public routes).

use axum::extract::OriginalUri;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::{ApiContext, SessionContext};

/// Record `METHOD /path` and the response status against the caller.
pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    // Nested routers see the path with `/api` stripped
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map_or_else(|| req.uri().path().to_string(), |uri| uri.path().to_string());
    let action = format!("{} {path}", req.method());
    let ctx = req.extensions().get::<ApiContext>().cloned();
    let caller = req
        .extensions()
        .get::<SessionContext>()
        .map(|auth| auth.session.user_id);

    let response = next.run(req).await;
    let status = response.status();
    tracing::debug!(%action, status = status.as_u16(), user_id = ?caller, "API request");

    match ctx {
        Some(ctx) => ctx.core.log_access(caller, &action, &format!("status:{}", status.as_u16())),
        None => tracing::warn!(%action, "Audit skipped: no API context on request"),
    }
    response
}
