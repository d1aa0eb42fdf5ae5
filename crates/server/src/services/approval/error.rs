//! Approval workflow error types.

use thiserror::Error;

use crate::services::email::NotifyError;
use crate::store::StoreError;

/// Errors that can occur while submitting or reviewing a submission.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Submission data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No pending submission with that id.
    #[error("submission not found")]
    NotFound,

    /// The submitting account no longer exists, so approval cannot apply.
    #[error("submitting account no longer exists")]
    SubmitterMissing,

    /// Store or queue call failed. The pending row is untouched.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Decline notification failed. The submission stays pending.
    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),

    /// The side effect was applied but the pending row could not be removed.
    #[error("approved, but the pending row could not be removed: {0}")]
    CleanupFailed(#[source] StoreError),
}

impl WorkflowError {
    /// Whether a caller may retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) | Self::CleanupFailed(e) => e.is_retryable(),
            Self::Notify(_) => true,
            Self::InvalidInput(_) | Self::NotFound | Self::SubmitterMissing => false,
        }
    }
}
