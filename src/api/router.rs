//! HTTP router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Rate limiter → 2. Auth validator → 3. Audit logger

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the portal API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);
    build_router(ctx)
}

pub(crate) fn build_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Rate limit → Auth → Audit (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/signout", post(endpoints::auth::sign_out))
        .route("/auth/session", get(endpoints::auth::session))
        .route("/dashboard", get(endpoints::dashboard::dashboard))
        .route(
            "/profile",
            get(endpoints::profile::get).patch(endpoints::profile::update),
        )
        .route("/profiles/:id", get(endpoints::profile::lookup))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/:id", put(endpoints::patients::update))
        .route(
            "/doctors",
            get(endpoints::doctors::list).post(endpoints::doctors::create),
        )
        .route("/doctors/:id", put(endpoints::doctors::update))
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/:id/status",
            patch(endpoints::appointments::set_status),
        )
        .route(
            "/medical-records",
            get(endpoints::medical_records::list).post(endpoints::medical_records::create),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (rate-limited only, no auth required)
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/signup", post(endpoints::auth::sign_up))
        .route("/auth/signin", post(endpoints::auth::sign_in))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    // Route guard works for both signed-in and anonymous callers
    let guard = Router::new()
        .route("/navigate", get(endpoints::navigation::navigate))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::optional_auth))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    let app = Router::new()
        .nest("/api", protected)
        .nest("/api", public)
        .nest("/api", guard)
        // Clinical data must never land in a shared cache
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    match cors_layer(ctx.core.config.cors_origin.as_deref()) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    match HeaderValue::from_str(origin) {
        Ok(value) => Some(
            CorsLayer::new()
                .allow_origin(value)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
                .allow_headers(Any),
        ),
        Err(_) => {
            tracing::warn!(origin, "Ignoring unparsable CORS origin");
            None
        }
    }
}
