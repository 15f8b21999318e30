//! Bearer session authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it to a live
//! session through the identity service, and injects `SessionContext`
//! into request extensions for downstream handlers.

use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{bearer_token, ApiContext, SessionContext};
use crate::identity::IdentityError;

/// Require a valid, unexpired session token.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = api_context(&req)?;
    let token = bearer_token(req.headers().get(header::AUTHORIZATION))
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    // Connection dropped before the handler runs
    let lookup = token.clone();
    let session = ctx
        .blocking(move |core| {
            let conn = core.open_db()?;
            Ok(core.identity().resolve(&conn, &lookup)?)
        })
        .await?;

    req.extensions_mut().insert(SessionContext { token, session });
    Ok(next.run(req).await)
}

/// Attach a `SessionContext` when the request carries a valid token,
/// and pass anonymous requests through untouched.
pub async fn optional_auth(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let ctx = match api_context(&req) {
        Ok(ctx) => ctx,
        Err(err) => return err.into_response(),
    };
    let token = bearer_token(req.headers().get(header::AUTHORIZATION)).map(str::to_string);

    if let Some(token) = token {
        let resolved = match ctx.core.open_db() {
            Ok(conn) => ctx.core.identity().resolve(&conn, &token),
            Err(err) => return ApiError::from(err).into_response(),
        };
        match resolved {
            Ok(session) => {
                req.extensions_mut().insert(SessionContext { token, session });
            }
            Err(IdentityError::SessionNotFound | IdentityError::SessionExpired) => {}
            Err(err) => return ApiError::from(err).into_response(),
        }
    }

    next.run(req).await
}

fn api_context(req: &Request<axum::body::Body>) -> Result<ApiContext, ApiError> {
    req.extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))
}
