//! Account domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use mintgate_core::{AccountId, AccountType, CreatorApplicationId, Email, ResetTokenId, Username};

/// A registered account.
///
/// Deliberately not `Serialize`: responses go through [`Profile`] so the
/// password hash can never reach the wire.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: Username,
    pub email: Email,
    pub password_hash: String,
    pub email_verified: bool,
    pub account_type: AccountType,
    pub wallet_id: Option<String>,
    pub kyc_verified: bool,
    pub kyc: KycProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity fields copied onto an account when its KYC submission is approved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KycProfile {
    pub legal_name: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub document_ref: Option<String>,
    pub face_image_ref: Option<String>,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: Username,
    pub email: Email,
    pub password_hash: String,
    pub account_type: AccountType,
}

/// Partial account update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub username: Option<Username>,
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub wallet_id: Option<String>,
    pub account_type: Option<AccountType>,
}

impl AccountUpdate {
    /// Whether applying this update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.wallet_id.is_none()
            && self.account_type.is_none()
    }
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub username: Username,
    pub email: Email,
    pub account_type: AccountType,
    pub wallet_id: Option<String>,
    pub email_verified: bool,
    pub kyc_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for Profile {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            email: account.email.clone(),
            account_type: account.account_type,
            wallet_id: account.wallet_id.clone(),
            email_verified: account.email_verified,
            kyc_verified: account.kyc_verified,
            created_at: account.created_at,
        }
    }
}

/// A persisted one-shot password reset record.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub id: ResetTokenId,
    pub account_id: AccountId,
    pub token_value: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Whether this row may still be consumed by `account` at `now`.
    #[must_use]
    pub fn is_usable_by(&self, account: AccountId, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at && self.account_id == account
    }
}

/// Input for persisting a reset token.
#[derive(Debug, Clone)]
pub struct NewResetToken {
    pub account_id: AccountId,
    pub token_value: String,
    pub expires_at: DateTime<Utc>,
}

/// An application to become a creator.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorApplication {
    pub id: CreatorApplicationId,
    pub username: Username,
    pub creator_name: String,
    pub website: String,
    pub social_links: Vec<String>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a creator application.
#[derive(Debug, Clone)]
pub struct NewCreatorApplication {
    pub username: Username,
    pub creator_name: String,
    pub website: String,
    pub social_links: Vec<String>,
    pub reason: String,
}
