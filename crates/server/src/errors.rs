use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use tradepost_core::errors::DomainError;
use tradepost_db::repositories::RepositoryError;

/// Boundary error type for every handler. Domain violations map onto it
/// losslessly; storage and unexpected failures collapse into a generic
/// internal error so nothing leaks and nothing crashes a request.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with a field-keyed error body, DRF style: `{"field": ["msg"]}`.
    Validation(BTreeMap<String, Vec<String>>),
    /// 400 with `{"error": msg}` — the shape status-update failures use.
    BadRequest(String),
    /// 400 with `{"detail": msg}` — business-rule rejections.
    Invalid(String),
    /// 401 with `{"detail": msg}`.
    Unauthorized(String),
    /// 403 with `{"detail": msg}`.
    Forbidden(String),
    /// 404 with `{"detail": msg}`.
    NotFound(String),
    /// 500 with a generic body; the cause is logged, never surfaced.
    Internal,
}

impl ApiError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.into(), vec![message.into()]);
        Self::Validation(map)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(fields) => {
                (StatusCode::BAD_REQUEST, Json(json!(fields))).into_response()
            }
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::Invalid(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": message }))).into_response()
            }
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "detail": message }))).into_response()
            }
            Self::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "detail": message }))).into_response()
            }
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": message }))).into_response()
            }
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "An unexpected error occurred." })),
            )
                .into_response(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { field, message } => Self::field(field, message),
            DomainError::PermissionDenied(message) => Self::Forbidden(message),
            DomainError::NotFound(what) => Self::NotFound(format!("{what} not found.")),
            DomainError::Conflict(message) => Self::Invalid(message),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        error!(event_name = "system.request.storage_error", error = %error, "storage failure");
        Self::Internal
    }
}
