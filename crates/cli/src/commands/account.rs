//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! mintgate-cli account set-type alice creator
//! ```
//!
//! Privileged account types are never granted through signup without a
//! configured code; this is the operator path for everything else.

use std::time::Duration;

use thiserror::Error;

use mintgate_core::{AccountType, Username};
use mintgate_server::db::{self, PgStore};
use mintgate_server::models::AccountUpdate;
use mintgate_server::store::{AccountStore, StoreError};

use super::{MissingEnvVar, database_url};

const STORE_DEADLINE: Duration = Duration::from_secs(10);

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountCommandError {
    #[error(transparent)]
    Env(#[from] MissingEnvVar),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid account type: {0}. Valid types: user, creator, admin")]
    InvalidAccountType(String),

    #[error("No account named {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

/// Change the type of an existing account.
pub async fn set_type(username: &str, account_type: &str) -> Result<(), AccountCommandError> {
    let username = Username::parse(username)
        .map_err(|e| AccountCommandError::InvalidUsername(e.to_string()))?;
    let account_type: AccountType = account_type
        .parse()
        .map_err(|_| AccountCommandError::InvalidAccountType(account_type.to_owned()))?;

    let pool = db::create_pool(&database_url()?).await?;
    let store = PgStore::new(pool, STORE_DEADLINE);

    let account = store
        .update_account(
            &username,
            AccountUpdate {
                account_type: Some(account_type),
                ..AccountUpdate::default()
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AccountCommandError::NotFound(username.to_string()),
            other => AccountCommandError::Store(other),
        })?;

    tracing::info!(
        target: "audit",
        username = %account.username,
        account_type = %account.account_type,
        actor = "cli",
        "Account type changed"
    );
    Ok(())
}
