//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::access::AccessError;
use crate::core_state::CoreError;
use crate::identity::IdentityError;
use crate::pages::PageError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    /// Present on failed saves: the form stays open for a retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog_open: Option<bool>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("{0}")]
    LoadFailed(String),
    #[error("{message}")]
    SaveFailed {
        status: StatusCode,
        message: String,
        field: Option<&'static str>,
    },
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut field = None;
        let mut dialog_open = None;
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
                "Session expired, sign in again".to_string(),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Retry after {retry_after}s"),
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail.clone()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail.clone()),
            ApiError::LoadFailed(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "LOAD_FAILED",
                message.clone(),
            ),
            ApiError::SaveFailed {
                status,
                message,
                field: failed_field,
            } => {
                field = *failed_field;
                dialog_open = Some(true);
                (*status, "SAVE_FAILED", message.clone())
            }
            ApiError::Unsupported(detail) => (
                StatusCode::NOT_IMPLEMENTED,
                "PROVISIONING_UNSUPPORTED",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                field,
                dialog_open,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => ApiError::InvalidCredentials,
            IdentityError::SessionNotFound => ApiError::Unauthorized,
            IdentityError::SessionExpired => ApiError::TokenExpired,
            IdentityError::EmailTaken => ApiError::Conflict(err.to_string()),
            IdentityError::RoleNotAllowed(_) => ApiError::Forbidden(err.to_string()),
            IdentityError::InvalidEmail | IdentityError::WeakPassword | IdentityError::MissingField(_) => {
                ApiError::BadRequest(err.to_string())
            }
            IdentityError::ProfileMissing | IdentityError::SessionTtlOutOfRange | IdentityError::Database(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

/// Direct store errors, for operations that bypass the page layer.
impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Denied(_) => ApiError::Forbidden(err.to_string()),
            AccessError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AccessError::Validation { .. } | AccessError::InvalidTransition { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            AccessError::Unsupported(message) => ApiError::Unsupported(message.to_string()),
            AccessError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PageError> for ApiError {
    fn from(err: PageError) -> Self {
        match &err {
            PageError::Load { .. } => ApiError::LoadFailed(err.to_string()),
            PageError::Save { source, .. } => {
                let status = match source {
                    AccessError::Denied(_) => StatusCode::FORBIDDEN,
                    AccessError::NotFound(_) => StatusCode::NOT_FOUND,
                    AccessError::Validation { .. } | AccessError::InvalidTransition { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    AccessError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
                    AccessError::Database(db) if db.is_constraint_violation() => StatusCode::CONFLICT,
                    AccessError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                // Field-level problems are safe to echo; anything else stays generic.
                let message = match source {
                    AccessError::Validation { .. } | AccessError::InvalidTransition { .. } => {
                        format!("{err}: {source}")
                    }
                    _ => err.to_string(),
                };
                ApiError::SaveFailed {
                    status,
                    message,
                    field: err.field(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn rate_limited_returns_429_with_retry_after() {
        let response = ApiError::RateLimited { retry_after: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn identity_errors_map_to_auth_codes() {
        let response = ApiError::from(IdentityError::InvalidCredentials).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_CREDENTIALS");

        let response = ApiError::from(IdentityError::SessionExpired).into_response();
        assert_eq!(body_json(response).await["error"]["code"], "TOKEN_EXPIRED");

        let response = ApiError::from(IdentityError::EmailTaken).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn load_failure_is_generic() {
        let err = PageError::load("appointments")(AccessError::Database(
            crate::db::DatabaseError::ConstraintViolation("boom".into()),
        ));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "LOAD_FAILED");
        assert_eq!(json["error"]["message"], "Failed to load appointments");
        assert!(json["error"].get("dialog_open").is_none());
    }

    #[tokio::test]
    async fn validation_save_failure_names_field_and_keeps_dialog() {
        let err = PageError::save("medical record")(AccessError::Validation {
            field: "diagnosis",
            reason: "is required".into(),
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "SAVE_FAILED");
        assert_eq!(json["error"]["field"], "diagnosis");
        assert_eq!(json["error"]["dialog_open"], true);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to save medical record"));
    }

    #[tokio::test]
    async fn denied_save_stays_generic() {
        let err = PageError::save("appointment")(AccessError::Denied("appointment"));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "Failed to save appointment");
    }

    #[tokio::test]
    async fn unsupported_returns_501() {
        let response = ApiError::from(AccessError::Unsupported("nope")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body_json(response).await["error"]["code"], "PROVISIONING_UNSUPPORTED");
    }

    #[tokio::test]
    async fn internal_returns_500() {
        let response = ApiError::Internal("something broke".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        // Internal errors hide details from client
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }
}
