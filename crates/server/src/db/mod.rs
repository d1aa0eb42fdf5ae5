//! `PostgreSQL` implementation of the store traits.
//!
//! ## Tables
//!
//! - `accounts` - Credentials, verification flags and approved KYC fields
//! - `password_reset_tokens` - One-shot reset rows
//! - `pending_kyc` - KYC submissions awaiting review
//! - `pending_releases` - Release submissions awaiting review
//! - `creator_applications`
//! - `queued_mints` - Downstream minting queue
//! - `listings`, `transactions` - Marketplace records
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p mintgate-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as` + `FromRow`) so the
//! workspace builds without a live database.

mod accounts;
mod kyc;
mod marketplace;
mod mint_queue;
mod releases;
mod reset_tokens;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use mintgate_core::{Email, Username};

use crate::store::{StoreError, with_deadline};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Postgres-backed store. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    deadline: Duration,
}

impl PgStore {
    /// Wrap a pool; every call is bounded by `deadline`.
    #[must_use]
    pub const fn new(pool: PgPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        with_deadline(self.deadline, fut).await
    }
}

/// Map a unique violation to `StoreError::Conflict`.
fn conflict_on_unique(what: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StoreError::Conflict(format!("{what} already exists"));
        }
        StoreError::Database(e)
    }
}

fn parse_username(raw: &str) -> Result<Username, StoreError> {
    Username::parse(raw)
        .map_err(|e| StoreError::DataCorruption(format!("invalid username in database: {e}")))
}

fn parse_email(raw: &str) -> Result<Email, StoreError> {
    Email::parse(raw)
        .map_err(|e| StoreError::DataCorruption(format!("invalid email in database: {e}")))
}
