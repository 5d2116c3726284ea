use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::json::json_response;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A session for the chip already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A chip session is missing or not in the required state.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(report.to_string().trim_end().to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl AppError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Conflict(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Conflict(ref msg) => {
                tracing::warn!("Conflict: {}", msg);
                sonic_rs::json!({ "error": msg })
            }

            AppError::NotFound(ref msg) => {
                tracing::debug!("Not found: {}", msg);
                sonic_rs::json!({ "error": msg })
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                sonic_rs::json!({ "error": msg })
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                sonic_rs::json!({
                    "error": "Internal server error",
                    "details": msg
                })
            }
        };

        json_response(status, &body)
    }
}
