//! In-process store used by tests and local experiments.
//!
//! Mirrors the Postgres semantics: unique usernames and emails, insertion
//! ordered pending queues, conditional deletes, and an idempotent mint queue.
//! A small fault-injection surface lets tests exercise failure paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use mintgate_core::{
    AccountId, CreatorApplicationId, Email, KycSubmissionId, ListingId, ReleaseSubmissionId,
    ResetTokenId, TransactionId, TransactionStatus, Username,
};

use super::{
    AccountStore, KycStore, MarketplaceStore, MintQueue, ReleaseStore, ResetTokenStore,
    StoreError,
};
use crate::models::{
    Account, AccountUpdate, CreatorApplication, KycProfile, KycSubmission, Listing, MintJob,
    NewAccount, NewCreatorApplication, NewKycSubmission, NewListing, NewReleaseSubmission,
    NewResetToken, NewTransaction, ReleaseSubmission, ResetToken, Transaction,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    accounts: Vec<Account>,
    reset_tokens: Vec<ResetToken>,
    kyc: BTreeMap<i32, KycSubmission>,
    releases: BTreeMap<i32, ReleaseSubmission>,
    creator_applications: Vec<CreatorApplication>,
    mint_jobs: Vec<MintJob>,
    listings: Vec<Listing>,
    transactions: Vec<Transaction>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn account_mut(&mut self, username: &Username) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| &a.username == username)
    }

    fn identity_taken(&self, username: Option<&Username>, email: Option<&Email>, skip: i32) -> bool {
        self.accounts.iter().any(|a| {
            a.id.as_i32() != skip
                && (username.is_some_and(|u| &a.username == u)
                    || email.is_some_and(|e| &a.email == e))
        })
    }
}

/// Thread-safe in-memory implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing_deletes: AtomicU32,
    failing_password_writes: AtomicU32,
    mint_down: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".into()));
        }
        Ok(self.tables.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Make the next `n` pending-row deletions fail with a retryable error.
    pub fn fail_next_deletes(&self, n: u32) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` password writes during a reset consume fail with a
    /// retryable error after the row is claimed. The claim is rolled back.
    pub fn fail_next_password_writes(&self, n: u32) {
        self.failing_password_writes.store(n, Ordering::SeqCst);
    }

    /// Make every mint enqueue fail until reset.
    pub fn set_mint_queue_down(&self, down: bool) {
        self.mint_down.store(down, Ordering::SeqCst);
    }

    /// Make every call fail with `StoreError::Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of the queued mint jobs.
    #[must_use]
    pub fn mint_jobs(&self) -> Vec<MintJob> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .mint_jobs
            .clone()
    }

    /// Snapshot of the stored reset rows.
    #[must_use]
    pub fn reset_tokens(&self) -> Vec<ResetToken> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset_tokens
            .clone()
    }

    fn injected_delete_failure(&self) -> Result<(), StoreError> {
        let remaining = self.failing_deletes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_deletes.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_username(&self, username: &Username) -> Result<Option<Account>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .accounts
            .iter()
            .find(|a| &a.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, StoreError> {
        let tables = self.tables()?;
        Ok(tables.accounts.iter().find(|a| &a.email == email).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.tables()?;
        if tables.identity_taken(Some(&account.username), Some(&account.email), 0) {
            return Err(StoreError::Conflict("username or email already exists".into()));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let account = Account {
            id: AccountId::new(id),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            email_verified: false,
            account_type: account.account_type,
            wallet_id: None,
            kyc_verified: false,
            kyc: KycProfile::default(),
            created_at: now,
            updated_at: now,
        };
        tables.accounts.push(account.clone());
        Ok(account)
    }

    async fn update_account(
        &self,
        username: &Username,
        update: AccountUpdate,
    ) -> Result<Account, StoreError> {
        let mut tables = self.tables()?;
        let id = tables
            .account_mut(username)
            .map(|a| a.id.as_i32())
            .ok_or(StoreError::NotFound)?;
        if tables.identity_taken(update.username.as_ref(), update.email.as_ref(), id) {
            return Err(StoreError::Conflict("username or email already exists".into()));
        }
        let account = tables.account_mut(username).ok_or(StoreError::NotFound)?;
        if let Some(username) = update.username {
            account.username = username;
        }
        if let Some(email) = update.email {
            account.email = email;
        }
        if let Some(hash) = update.password_hash {
            account.password_hash = hash;
        }
        if let Some(wallet_id) = update.wallet_id {
            account.wallet_id = Some(wallet_id);
        }
        if let Some(account_type) = update.account_type {
            account.account_type = account_type;
        }
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn set_email_verified(&self, username: &Username) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        Ok(tables.account_mut(username).is_some_and(|account| {
            account.email_verified = true;
            true
        }))
    }

    async fn apply_kyc(
        &self,
        username: &Username,
        profile: &KycProfile,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        Ok(tables.account_mut(username).is_some_and(|account| {
            account.kyc = profile.clone();
            account.kyc_verified = true;
            account.updated_at = Utc::now();
            true
        }))
    }

    async fn insert_creator_application(
        &self,
        application: NewCreatorApplication,
    ) -> Result<CreatorApplication, StoreError> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        let application = CreatorApplication {
            id: CreatorApplicationId::new(id),
            username: application.username,
            creator_name: application.creator_name,
            website: application.website,
            social_links: application.social_links,
            reason: application.reason,
            created_at: Utc::now(),
        };
        tables.creator_applications.push(application.clone());
        Ok(application)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.tables().map(|_| ())
    }
}

#[async_trait]
impl ResetTokenStore for MemoryStore {
    async fn insert_reset_token(&self, token: NewResetToken) -> Result<ResetToken, StoreError> {
        let mut tables = self.tables()?;
        if tables
            .reset_tokens
            .iter()
            .any(|t| t.token_value == token.token_value)
        {
            return Err(StoreError::Conflict("reset token value already exists".into()));
        }
        let id = tables.next_id();
        let token = ResetToken {
            id: ResetTokenId::new(id),
            account_id: token.account_id,
            token_value: token.token_value,
            used: false,
            expires_at: token.expires_at,
        };
        tables.reset_tokens.push(token.clone());
        Ok(token)
    }

    async fn find_reset_token(
        &self,
        value: &str,
        account: AccountId,
    ) -> Result<Option<ResetToken>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .reset_tokens
            .iter()
            .find(|t| t.token_value == value && t.account_id == account)
            .cloned())
    }

    async fn consume_reset_token(
        &self,
        id: ResetTokenId,
        account: AccountId,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let Some(row) = tables
            .reset_tokens
            .iter()
            .position(|t| t.id == id && t.account_id == account && !t.used)
        else {
            return Ok(false);
        };
        let Some(owner) = tables.accounts.iter().position(|a| a.id == account) else {
            return Ok(false);
        };

        let remaining = self.failing_password_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_password_writes
                .store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected password write failure".into()));
        }

        if let Some(token) = tables.reset_tokens.get_mut(row) {
            token.used = true;
        }
        if let Some(account) = tables.accounts.get_mut(owner) {
            account.password_hash = password_hash.to_owned();
            account.updated_at = Utc::now();
        }
        Ok(true)
    }
}

#[async_trait]
impl KycStore for MemoryStore {
    async fn insert_pending_kyc(
        &self,
        submission: NewKycSubmission,
    ) -> Result<KycSubmission, StoreError> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        let submission = KycSubmission {
            id: KycSubmissionId::new(id),
            username: submission.username,
            details: submission.details,
            created_at: Utc::now(),
        };
        tables.kyc.insert(id, submission.clone());
        Ok(submission)
    }

    async fn list_pending_kyc(&self) -> Result<Vec<KycSubmission>, StoreError> {
        Ok(self.tables()?.kyc.values().cloned().collect())
    }

    async fn get_pending_kyc(
        &self,
        id: KycSubmissionId,
    ) -> Result<Option<KycSubmission>, StoreError> {
        Ok(self.tables()?.kyc.get(&id.as_i32()).cloned())
    }

    async fn delete_pending_kyc(&self, id: KycSubmissionId) -> Result<bool, StoreError> {
        self.injected_delete_failure()?;
        Ok(self.tables()?.kyc.remove(&id.as_i32()).is_some())
    }
}

#[async_trait]
impl ReleaseStore for MemoryStore {
    async fn insert_pending_release(
        &self,
        submission: NewReleaseSubmission,
    ) -> Result<ReleaseSubmission, StoreError> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        let submission = ReleaseSubmission {
            id: ReleaseSubmissionId::new(id),
            username: submission.username,
            title: submission.title,
            release_date: submission.release_date,
            estimated_count: submission.estimated_count,
            notes: submission.notes,
            media_ref: submission.media_ref,
            created_at: Utc::now(),
        };
        tables.releases.insert(id, submission.clone());
        Ok(submission)
    }

    async fn list_pending_release(&self) -> Result<Vec<ReleaseSubmission>, StoreError> {
        Ok(self.tables()?.releases.values().cloned().collect())
    }

    async fn get_pending_release(
        &self,
        id: ReleaseSubmissionId,
    ) -> Result<Option<ReleaseSubmission>, StoreError> {
        Ok(self.tables()?.releases.get(&id.as_i32()).cloned())
    }

    async fn delete_pending_release(&self, id: ReleaseSubmissionId) -> Result<bool, StoreError> {
        self.injected_delete_failure()?;
        Ok(self.tables()?.releases.remove(&id.as_i32()).is_some())
    }
}

#[async_trait]
impl MintQueue for MemoryStore {
    async fn enqueue(&self, job: MintJob) -> Result<bool, StoreError> {
        if self.mint_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("mint queue down".into()));
        }
        let mut tables = self.tables()?;
        if tables
            .mint_jobs
            .iter()
            .any(|j| j.source_release == job.source_release)
        {
            return Ok(false);
        }
        tables.mint_jobs.push(job);
        Ok(true)
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        let listing = Listing {
            id: ListingId::new(id),
            release_name: listing.release_name,
            seller_address: listing.seller_address,
            price: listing.price,
            image_url: listing.image_url,
            listed_at: Utc::now(),
        };
        tables.listings.push(listing.clone());
        Ok(listing)
    }

    async fn list_listings(&self) -> Result<Vec<Listing>, StoreError> {
        // Ids are monotonic, so reverse insertion order is newest first even
        // when two rows share a timestamp.
        Ok(self.tables()?.listings.iter().rev().cloned().collect())
    }

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        let transaction = Transaction {
            id: TransactionId::new(id),
            client_id: transaction.client_id,
            transaction_type: transaction.transaction_type,
            items_sent: transaction.items_sent,
            items_received: transaction.items_received,
            notes: transaction.notes,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        };
        tables.transactions.push(transaction.clone());
        Ok(transaction)
    }
}
