use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error; // Use thiserror for cleaner error definitions

use crate::token::TokenError;
use crate::validation::FieldErrors;

/// Message shared by every failed login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Email or username already in use")]
    Conflict,

    #[error("Stored record could not be parsed: {0}")]
    DataCorruption(String),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from DB layer
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    // Auth errors
    #[error("Email or username already in use")]
    Conflict,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing token")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken(#[source] TokenError),

    #[error("{0} not found")]
    NotFound(&'static str),

    // Domain/Service level errors (mapped from RepoError)
    #[error("Could not complete database operation")]
    RepositoryError(#[source] RepoError), // Source allows seeing underlying RepoError

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String), // Catch-all or specific internal issues
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Conflict => AppError::Conflict,
            e => AppError::RepositoryError(e),
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::Validation(errors) => {
                tracing::debug!(%errors, "Rejecting request with validation errors");
                let body = serde_json::json!({
                    "error": "Validation failed",
                    "fieldErrors": errors,
                });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            AppError::InvalidBody(e) => {
                // Size and content-type rejections keep their own status.
                let status = match e {
                    JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
                    other => other.status(),
                };
                (status, format!("Invalid request body: {}", e.body_text()))
            }
            AppError::Conflict => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()),
            AppError::MissingToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidToken(e) => {
                tracing::debug!(error.source = %e, "Token rejected");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),

            // 5xx Server Errors
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database operation failed".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            }
        };

        tracing::warn!(error.message = %error_message, error.status = %status, "Responding with error");

        // Build JSON response
        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}
