//! Account service error types.

use thiserror::Error;

use mintgate_core::{EmailError, UsernameError};

use crate::store::StoreError;
use crate::tokens::TokenError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Request data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Username or email already registered.
    #[error("username or email already registered")]
    DuplicateIdentity,

    /// No account with that username.
    #[error("account not found")]
    NotFound,

    /// Password did not match.
    #[error("incorrect password")]
    BadPassword,

    /// Login attempted before the email address was confirmed.
    #[error("email address not verified")]
    EmailNotVerified,

    /// A presented token failed verification.
    #[error("invalid token: {0}")]
    InvalidToken(#[source] TokenError),

    /// Password reset rejected by either guard.
    #[error("reset token is invalid or expired")]
    InvalidOrExpired,

    /// Privileged signup refused.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Store call failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Hashing or signing failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<UsernameError> for AccountError {
    fn from(err: UsernameError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<EmailError> for AccountError {
    fn from(err: EmailError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Map a store conflict onto the identity-collision error.
pub(super) fn duplicate_on_conflict(err: StoreError) -> AccountError {
    match err {
        StoreError::Conflict(_) => AccountError::DuplicateIdentity,
        other => AccountError::Store(other),
    }
}
