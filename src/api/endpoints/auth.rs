//! Authentication endpoints.
//!
//! - `POST /api/auth/signup`: create an account, returns a session
//! - `POST /api/auth/signin`: email + password, returns a session
//! - `POST /api/auth/signout`: invalidate the current token
//! - `GET /api/auth/session`: who am I, plus the role menu

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionContext};
use crate::identity::{IssuedSession, SignInRequest, SignUpRequest};
use crate::models::Profile;
use crate::navigation::{menu_for, MenuItem};

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub profile: Profile,
    pub menu: Vec<MenuItem>,
}

impl From<IssuedSession> for AuthResponse {
    fn from(issued: IssuedSession) -> Self {
        let menu = menu_for(issued.session.role());
        Self {
            token: issued.token,
            expires_at: issued.session.expires_at,
            profile: issued.session.profile,
            menu,
        }
    }
}

/// `POST /api/auth/signup`
pub async fn sign_up(
    State(ctx): State<ApiContext>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let issued = ctx
        .blocking(move |core| {
            let conn = core.open_db()?;
            let identity = core.identity();
            let profile = identity.sign_up(&conn, &request)?;
            Ok(identity.issue_session(&conn, &profile.user_id)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// `POST /api/auth/signin`
pub async fn sign_in(
    State(ctx): State<ApiContext>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let issued = ctx
        .blocking(move |core| {
            let conn = core.open_db()?;
            Ok(core.identity().sign_in(&conn, &request)?)
        })
        .await?;
    Ok(Json(issued.into()))
}

/// `POST /api/auth/signout`
pub async fn sign_out(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<SessionContext>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    ctx.core.identity().sign_out(&conn, &auth.token)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub profile: Profile,
    pub expires_at: NaiveDateTime,
    pub menu: Vec<MenuItem>,
}

/// `GET /api/auth/session`
pub async fn session(Extension(auth): Extension<SessionContext>) -> Json<SessionResponse> {
    let session = auth.session;
    Json(SessionResponse {
        menu: menu_for(session.role()),
        expires_at: session.expires_at,
        profile: session.profile,
    })
}
