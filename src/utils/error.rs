use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::api_response::ApiResponse;

/// Errors surfaced at the handler boundary. Each variant maps to one HTTP
/// status and is rendered as an `ApiResponse` error envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}: {detail}")]
    Dependency { message: String, detail: String },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// A database, filesystem or crypto failure. The raw error text is echoed
    /// to the caller next to `message`.
    pub fn dependency(message: impl Into<String>, source: impl std::fmt::Display) -> Self {
        AppError::Dependency {
            message: message.into(),
            detail: source.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Dependency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AppError> for ApiResponse<()> {
    fn from(err: AppError) -> Self {
        let status = err.status();
        match err {
            AppError::Dependency { message, detail } => {
                ApiResponse::error(status, message, Some(detail))
            }
            AppError::Validation(message)
            | AppError::Unauthorized(message)
            | AppError::NotFound(message)
            | AppError::Conflict(message) => ApiResponse::error(status, message, None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Dependency { message, detail } => error!("{message}: {detail}"),
            other => warn!("Request rejected ({}): {other}", other.status()),
        }
        ApiResponse::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_status_codes() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::dependency("x", "boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn dependency_error_keeps_source_text() {
        let response = ApiResponse::from(AppError::dependency("Failed to fetch", "pool timed out"));
        assert_eq!(response.message, "Failed to fetch");
        assert_eq!(response.error.as_deref(), Some("pool timed out"));
        assert!(!response.success);
    }
}
