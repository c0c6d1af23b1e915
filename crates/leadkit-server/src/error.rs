use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use leadkit_core::error::StoreError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Store errors collapse onto the HTTP taxonomy: validation-shaped failures
/// become 400, missing rows become 404, everything else is a logged 500.
impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(_)
            | StoreError::AlreadyExists { .. }
            | StoreError::MissingReference { .. }
            | StoreError::InvalidTransition { .. } => AppError::BadRequest(e.to_string()),
            StoreError::NotFound { .. } => AppError::NotFound(e.to_string()),
            StoreError::Schema(_) | StoreError::Database(_) => {
                AppError::Internal(anyhow::anyhow!(e))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.as_str()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.as_str())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", "Forbidden"),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": null
                }
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_maps_to_bad_request() {
        let err: AppError = StoreError::invalid_transition("deal", "won", "move").into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err: AppError = StoreError::not_found("contact").into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn database_failure_maps_to_internal() {
        let err: AppError = StoreError::Database("disk full".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
