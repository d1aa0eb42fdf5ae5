//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Bodies are JSON: `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::accounts::AccountError;
use crate::services::approval::WorkflowError;
use crate::services::marketplace::MarketplaceError;
use crate::services::uploads::UploadError;
use crate::store::StoreError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Account operation failed.
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// Approval workflow operation failed.
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Marketplace operation failed.
    #[error("Marketplace error: {0}")]
    Marketplace(#[from] MarketplaceError),

    /// Upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Store call failed outside a service.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Missing or invalid session.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "Internal server error";
const UNAVAILABLE: &str = "Service temporarily unavailable, please retry";

fn store_status(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        StoreError::Conflict(_) => (StatusCode::CONFLICT, "Conflict".to_string()),
        e if e.is_retryable() => (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
    }
}

impl AppError {
    /// Status code and client-safe message. Internal details are never
    /// exposed.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Account(err) => match err {
                AccountError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                AccountError::DuplicateIdentity => (
                    StatusCode::CONFLICT,
                    "Username or email already registered".to_string(),
                ),
                AccountError::NotFound => (StatusCode::NOT_FOUND, "Account not found".to_string()),
                AccountError::BadPassword => {
                    (StatusCode::UNAUTHORIZED, "Incorrect password".to_string())
                }
                AccountError::EmailNotVerified => (
                    StatusCode::FORBIDDEN,
                    "Email address not verified".to_string(),
                ),
                AccountError::InvalidToken(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
                AccountError::InvalidOrExpired => (
                    StatusCode::UNAUTHORIZED,
                    "Reset link is invalid or expired".to_string(),
                ),
                AccountError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
                AccountError::Store(e) => store_status(e),
                AccountError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
                }
            },
            Self::Workflow(err) => match err {
                WorkflowError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                WorkflowError::NotFound => {
                    (StatusCode::NOT_FOUND, "Submission not found".to_string())
                }
                WorkflowError::SubmitterMissing => (
                    StatusCode::CONFLICT,
                    "Submitting account no longer exists".to_string(),
                ),
                WorkflowError::Store(e) => store_status(e),
                WorkflowError::Notify(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Could not notify the submitter; submission left pending".to_string(),
                ),
                WorkflowError::CleanupFailed(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Approved, but the submission could not be cleared; retry".to_string(),
                ),
            },
            Self::Marketplace(err) => match err {
                MarketplaceError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                MarketplaceError::Store(e) => store_status(e),
            },
            Self::Upload(err) => match err {
                UploadError::Empty | UploadError::InvalidName(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                UploadError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
            },
            Self::Store(e) => store_status(e),
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
            ),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a username.
///
/// Called after a session is verified to associate errors with accounts.
pub fn set_sentry_user(username: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}
