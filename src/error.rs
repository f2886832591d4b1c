//! Crate-wide error type.
//!
//! Every registry operation returns [`AppResult`]. With the `web` feature the
//! error converts straight into an HTTP response carrying `{"error": "..."}`.

use thiserror::Error;

/// Result alias used across the crate
pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Unauthorized")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid file type. Please upload CSV or Excel files.")]
    UnsupportedFileType(String),

    #[error("No file selected")]
    NoFileProvided,

    #[error("File exceeds the maximum upload size of {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Error processing file: {0}")]
    Parse(String),

    #[error("File not found")]
    FileMissing,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// True for the failures that are the server's fault rather than the caller's.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Io(_) | AppError::Json(_) | AppError::Internal(_)
        )
    }
}

#[cfg(feature = "web")]
mod response {
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde_json::json;

    use super::AppError;

    impl AppError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
                AppError::Forbidden => StatusCode::FORBIDDEN,
                AppError::NotFound(_) | AppError::FileMissing => StatusCode::NOT_FOUND,
                AppError::Validation(_)
                | AppError::UnsupportedFileType(_)
                | AppError::NoFileProvided
                | AppError::Parse(_) => StatusCode::BAD_REQUEST,
                AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                AppError::Database(_)
                | AppError::Io(_)
                | AppError::Json(_)
                | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            let message = if self.is_internal() {
                // Detail stays in the log, the client gets a generic message.
                tracing::error!(error = ?self, "request failed");
                "Internal server error".to_string()
            } else {
                self.to_string()
            };

            (status, Json(json!({ "error": message }))).into_response()
        }
    }
}
