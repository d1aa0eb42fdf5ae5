//! Persistence seams.
//!
//! Services depend on these traits, never on a concrete backend. The
//! production implementation is [`crate::db::PgStore`]; [`MemoryStore`] backs
//! the test suites.
//!
//! Every operation is parameterized and, in the Postgres backend, bounded by
//! a per-call deadline (see [`with_deadline`]). Deletions of pending rows are
//! conditional and report `false` instead of failing when the row is gone.

pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use mintgate_core::{
    AccountId, Email, KycSubmissionId, ReleaseSubmissionId, ResetTokenId, Username,
};

use crate::models::{
    Account, AccountUpdate, CreatorApplication, KycProfile, KycSubmission, Listing, MintJob,
    NewAccount, NewCreatorApplication, NewKycSubmission, NewListing, NewReleaseSubmission,
    NewResetToken, NewTransaction, ReleaseSubmission, ResetToken, Transaction,
};

pub use memory::MemoryStore;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Backend refused or dropped the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within its deadline.
    #[error("store call exceeded its {0:?} deadline")]
    Timeout(Duration),
}

impl StoreError {
    /// Whether the caller may reasonably retry the same call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_)
                | Self::Timeout(_)
                | Self::Database(
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
        )
    }
}

/// Run a store call under a deadline.
///
/// # Errors
///
/// Returns `StoreError::Timeout` if `fut` does not complete within
/// `deadline`, otherwise whatever `fut` returns.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| StoreError::Timeout(deadline))?
}

/// Account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_username(&self, username: &Username) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, StoreError>;

    /// Returns `StoreError::Conflict` if the username or email is taken.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Apply a partial update. Returns `StoreError::NotFound` if the account
    /// does not exist and `StoreError::Conflict` on a username/email clash.
    async fn update_account(
        &self,
        username: &Username,
        update: AccountUpdate,
    ) -> Result<Account, StoreError>;

    /// Returns `false` if no such account exists.
    async fn set_email_verified(&self, username: &Username) -> Result<bool, StoreError>;

    /// Copy approved KYC fields onto the account and mark it verified.
    /// Returns `false` if no such account exists.
    async fn apply_kyc(
        &self,
        username: &Username,
        profile: &KycProfile,
    ) -> Result<bool, StoreError>;

    async fn insert_creator_application(
        &self,
        application: NewCreatorApplication,
    ) -> Result<CreatorApplication, StoreError>;

    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// One-shot password reset rows.
#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn insert_reset_token(&self, token: NewResetToken) -> Result<ResetToken, StoreError>;

    /// Look up a row by its opaque value, scoped to the owning account.
    async fn find_reset_token(
        &self,
        value: &str,
        account: AccountId,
    ) -> Result<Option<ResetToken>, StoreError>;

    /// Mark the row used and store `password_hash` on its account as one
    /// unit. Returns `false`, changing nothing, if the row was already used,
    /// is gone, or belongs to another account, so concurrent consumers
    /// cannot both win. On error neither change is applied.
    async fn consume_reset_token(
        &self,
        id: ResetTokenId,
        account: AccountId,
        password_hash: &str,
    ) -> Result<bool, StoreError>;
}

/// Pending KYC submissions.
#[async_trait]
pub trait KycStore: Send + Sync {
    async fn insert_pending_kyc(
        &self,
        submission: NewKycSubmission,
    ) -> Result<KycSubmission, StoreError>;

    /// Pending submissions in insertion order.
    async fn list_pending_kyc(&self) -> Result<Vec<KycSubmission>, StoreError>;

    async fn get_pending_kyc(
        &self,
        id: KycSubmissionId,
    ) -> Result<Option<KycSubmission>, StoreError>;

    /// Returns `false` if the row was already gone.
    async fn delete_pending_kyc(&self, id: KycSubmissionId) -> Result<bool, StoreError>;
}

/// Pending release submissions.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    async fn insert_pending_release(
        &self,
        submission: NewReleaseSubmission,
    ) -> Result<ReleaseSubmission, StoreError>;

    /// Pending submissions in insertion order.
    async fn list_pending_release(&self) -> Result<Vec<ReleaseSubmission>, StoreError>;

    async fn get_pending_release(
        &self,
        id: ReleaseSubmissionId,
    ) -> Result<Option<ReleaseSubmission>, StoreError>;

    /// Returns `false` if the row was already gone.
    async fn delete_pending_release(&self, id: ReleaseSubmissionId) -> Result<bool, StoreError>;
}

/// Everything the credential and approval services persist.
pub trait CredentialStore: AccountStore + ResetTokenStore + KycStore + ReleaseStore {}

impl<T> CredentialStore for T where T: AccountStore + ResetTokenStore + KycStore + ReleaseStore {}

/// Downstream minting queue.
#[async_trait]
pub trait MintQueue: Send + Sync {
    /// Queue a mint job. Returns `false` when a job for the same source
    /// release is already queued, which is not an error.
    async fn enqueue(&self, job: MintJob) -> Result<bool, StoreError>;
}

/// Marketplace listings and transactions.
#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError>;

    /// Listings, newest first.
    async fn list_listings(&self) -> Result<Vec<Listing>, StoreError>;

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, StoreError>;
}
