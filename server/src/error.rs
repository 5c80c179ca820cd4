//! Error types for the tutoring backend

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tutoring backend.
///
/// Failures inside the *user's* code are never represented here; they are
/// reported as data in the execution outcome. This enum covers failures of
/// the machinery itself plus client mistakes.
#[derive(Debug, Error)]
pub enum Error {
    // Execution errors (2000-2999)
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    // Session errors (3000-3999)
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // Step generator errors (4000-4999)
    #[error("Step generation failed: {0}")]
    StepGeneration(String),

    // General errors (1000-1999)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> u32 {
        match self {
            Error::UnsupportedLanguage(_) => 2001,
            Error::SessionNotFound(_) => 3001,
            Error::StepGeneration(_) => 4001,
            Error::InvalidRequest(_) => 1001,
            Error::Internal(_) => 1002,
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UnsupportedLanguage(_) | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::StepGeneration(_) => StatusCode::BAD_GATEWAY,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::StepGeneration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            Error::UnsupportedLanguage("ruby".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::SessionNotFound("abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
