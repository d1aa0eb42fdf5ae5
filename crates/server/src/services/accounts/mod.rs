//! Account lifecycle: registration, login, email verification, password
//! reset, profile changes and wallet linkage.
//!
//! Irreversible transitions are guarded by typed tokens from
//! [`TokenService`]. Password reset additionally requires a persisted
//! single-use row; the two guards are checked independently and both must
//! pass.

mod error;
mod password;

pub use error::AccountError;
pub use password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use mintgate_core::{AccountType, Email, TokenKind, Username};

use crate::config::SignupCodes;
use crate::models::{
    Account, AccountUpdate, CreatorApplication, NewAccount, NewCreatorApplication, NewResetToken,
    Profile,
};
use crate::services::email::{Notification, Notifier};
use crate::store::{CredentialStore, StoreError};
use crate::tokens::{TokenService, VerifiedToken};

use error::duplicate_on_conflict;
use password::{hash_password, validate_password, verify_password};

/// Length of the opaque value stored in a reset row.
const RESET_VALUE_LENGTH: usize = 48;

/// Creator applications carry at most this many social links.
pub const MAX_SOCIAL_LINKS: usize = 2;

/// Request for an account type above `user`, unlocked by a signup code.
#[derive(Debug, Clone, Deserialize)]
pub struct Privilege {
    pub account_type: AccountType,
    pub signup_code: SecretString,
}

/// Registration input.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub privilege: Option<Privilege>,
}

/// Requested profile changes. `None` leaves a field untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

/// Creator application input.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatorApplicationForm {
    pub creator_name: String,
    pub website: String,
    #[serde(default)]
    pub social_links: Vec<String>,
    pub reason: String,
}

/// Account operations over a [`CredentialStore`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    notifier: Arc<dyn Notifier>,
    base_url: String,
    app_url: String,
    signup_codes: SignupCodes,
}

impl AccountService {
    /// Verification links point at `base_url` (this API). Reset links point
    /// at `app_url`, the frontend that serves the `/reset_password` form.
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: TokenService,
        notifier: Arc<dyn Notifier>,
        base_url: &str,
        app_url: &str,
        signup_codes: SignupCodes,
    ) -> Self {
        Self {
            store,
            tokens,
            notifier,
            base_url: base_url.trim_end_matches('/').to_owned(),
            app_url: app_url.trim_end_matches('/').to_owned(),
            signup_codes,
        }
    }

    // =========================================================================
    // Registration and login
    // =========================================================================

    /// Register a new, unverified account and email a verification link.
    ///
    /// A failed verification email is logged; the account still exists.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidInput` for a malformed username, email
    /// or password, `AccountError::Forbidden` if a privilege is requested
    /// with a wrong or unconfigured code, and
    /// `AccountError::DuplicateIdentity` if the username or email is taken.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<Account, AccountError> {
        let username = Username::parse(&registration.username)?;
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;
        let account_type = self.resolve_account_type(registration.privilege.as_ref())?;

        let password_hash = hash_password(registration.password).await?;
        let account = self
            .store
            .insert_account(NewAccount {
                username,
                email,
                password_hash,
                account_type,
            })
            .await
            .map_err(duplicate_on_conflict)?;

        if account_type != AccountType::User {
            tracing::info!(
                target: "audit",
                username = %account.username,
                account_type = %account_type,
                "Privileged account created via signup code"
            );
        }
        tracing::info!(username = %account.username, "Account registered");

        if let Err(e) = self.send_verification(&account).await {
            tracing::error!(username = %account.username, error = %e, "Failed to send verification email");
        }

        Ok(account)
    }

    fn resolve_account_type(
        &self,
        privilege: Option<&Privilege>,
    ) -> Result<AccountType, AccountError> {
        let Some(privilege) = privilege else {
            return Ok(AccountType::User);
        };
        let configured = match privilege.account_type {
            AccountType::User => return Ok(AccountType::User),
            AccountType::Creator => self.signup_codes.creator.as_ref(),
            AccountType::Admin => self.signup_codes.admin.as_ref(),
        };
        let matches = configured.is_some_and(|code| {
            constant_time_eq(
                code.expose_secret().as_bytes(),
                privilege.signup_code.expose_secret().as_bytes(),
            )
        });
        if matches {
            Ok(privilege.account_type)
        } else {
            tracing::warn!(
                target: "audit",
                requested = %privilege.account_type,
                "Privileged signup refused"
            );
            Err(AccountError::Forbidden("invalid signup code".into()))
        }
    }

    async fn send_verification(&self, account: &Account) -> Result<(), AccountError> {
        let token = self
            .tokens
            .issue_with_id(
                &account.username,
                TokenKind::EmailVerification,
                TokenKind::EmailVerification.default_ttl(),
                &account.id.to_string(),
            )
            .map_err(|e| AccountError::Internal(e.to_string()))?;
        let link = format!("{}/api/auth/verify_email?token={token}", self.base_url);
        let message = Notification::verify_email(account.username.as_str(), &link)
            .map_err(|e| AccountError::Internal(e.to_string()))?;
        self.notifier
            .send(&account.email, &message)
            .await
            .map_err(|e| AccountError::Internal(e.to_string()))
    }

    /// Authenticate and return a session token.
    ///
    /// The password is checked before the verification flag so an
    /// unverified account is only revealed to its owner.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound`, `AccountError::BadPassword` or
    /// `AccountError::EmailNotVerified`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: SecretString) -> Result<String, AccountError> {
        let username = Username::parse(username).map_err(|_| AccountError::NotFound)?;
        let account = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or(AccountError::NotFound)?;

        if !verify_password(password, account.password_hash.clone()).await? {
            tracing::warn!(username = %username, "Login failed: bad password");
            return Err(AccountError::BadPassword);
        }
        if !account.email_verified {
            return Err(AccountError::EmailNotVerified);
        }

        tracing::info!(username = %username, "Login succeeded");
        self.issue_session(&account)
    }

    /// Issue a fresh session token for `account`, bound to its id.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Internal` if signing fails.
    pub fn issue_session(&self, account: &Account) -> Result<String, AccountError> {
        self.tokens
            .issue_with_id(
                &account.username,
                TokenKind::Session,
                TokenKind::Session.default_ttl(),
                &account.id.to_string(),
            )
            .map_err(|e| AccountError::Internal(e.to_string()))
    }

    /// The account a session or verification token was issued to.
    ///
    /// Usernames can change hands, so the subject alone is not enough: the
    /// token's id must match the account currently holding that name.
    /// Returns `None` when it does not.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Store` if the lookup fails.
    pub async fn token_owner(
        &self,
        verified: &VerifiedToken,
    ) -> Result<Option<Account>, AccountError> {
        let account = self.store.find_by_username(&verified.subject).await?;
        Ok(account.filter(|account| {
            verified.token_id.as_deref() == Some(account.id.to_string().as_str())
        }))
    }

    /// Mark the token's subject as verified. Repeating it is harmless.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidToken` if the token fails verification
    /// and `AccountError::NotFound` if the account it was issued to no longer
    /// holds the token's username.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> Result<(), AccountError> {
        let verified = self
            .tokens
            .verify(token, TokenKind::EmailVerification)
            .map_err(AccountError::InvalidToken)?;
        let account = self.token_owner(&verified).await?.ok_or_else(|| {
            tracing::warn!(username = %verified.subject, "Verification token names another account");
            AccountError::NotFound
        })?;

        if !self.store.set_email_verified(&account.username).await? {
            return Err(AccountError::NotFound);
        }
        tracing::info!(username = %account.username, "Email verified");
        Ok(())
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Start a password reset.
    ///
    /// Succeeds whether or not an account uses `email`, so callers cannot
    /// probe for registered addresses. For a real account a single-use row
    /// is stored and its opaque value travels inside a signed reset token.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidInput` for a malformed address and
    /// `AccountError::Store` if the store is unreachable.
    #[instrument(skip_all)]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AccountError> {
        let email = Email::parse(email)?;
        let Some(account) = self.store.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown address");
            return Ok(());
        };

        let ttl = TokenKind::PasswordReset.default_ttl();
        let value = random_reset_value();
        let row = self
            .store
            .insert_reset_token(NewResetToken {
                account_id: account.id,
                token_value: value.clone(),
                expires_at: Utc::now() + ttl,
            })
            .await?;

        let token = self
            .tokens
            .issue_with_id(&account.username, TokenKind::PasswordReset, ttl, &value)
            .map_err(|e| AccountError::Internal(e.to_string()))?;
        let link = format!("{}/reset_password?token={token}", self.app_url);

        let sent = match Notification::password_reset(account.username.as_str(), &link) {
            Ok(message) => self.notifier.send(&account.email, &message).await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            tracing::error!(username = %account.username, error = %e, "Failed to send password reset email");
        }

        tracing::info!(username = %account.username, token_row = %row.id, "Password reset issued");
        Ok(())
    }

    /// Consume a reset token and set a new password.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidOrExpired` if either the signed token
    /// or its persisted row is rejected, or the row was consumed
    /// concurrently. Returns `AccountError::InvalidInput` for a weak
    /// password without consuming the token.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: SecretString,
    ) -> Result<(), AccountError> {
        // Guard 1: signature, kind and expiry of the signed token.
        let verified = self
            .tokens
            .verify(token, TokenKind::PasswordReset)
            .map_err(|e| {
                tracing::warn!(error = %e, "Reset token rejected");
                AccountError::InvalidOrExpired
            })?;
        let value = verified.token_id.ok_or(AccountError::InvalidOrExpired)?;

        // Guard 2: the persisted row, scoped to the account that currently
        // holds the subject's name. Rows issued before a rename belong to a
        // different account id and never match.
        let account = self
            .store
            .find_by_username(&verified.subject)
            .await?
            .ok_or(AccountError::InvalidOrExpired)?;
        let row = self
            .store
            .find_reset_token(&value, account.id)
            .await?
            .filter(|row| row.is_usable_by(account.id, Utc::now()))
            .ok_or(AccountError::InvalidOrExpired)?;

        validate_password(&new_password)?;
        let password_hash = hash_password(new_password).await?;

        if !self
            .store
            .consume_reset_token(row.id, account.id, &password_hash)
            .await?
        {
            return Err(AccountError::InvalidOrExpired);
        }

        tracing::info!(username = %account.username, "Password reset completed");
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Public view of an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account does not exist.
    pub async fn profile(&self, username: &Username) -> Result<Profile, AccountError> {
        self.find(username).await.map(|account| Profile::from(&account))
    }

    /// Apply profile changes. Unset fields are left untouched and a new
    /// password is re-hashed.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidInput`, `AccountError::DuplicateIdentity`
    /// or `AccountError::NotFound`.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        username: &Username,
        changes: ProfileChanges,
    ) -> Result<Account, AccountError> {
        let mut update = AccountUpdate {
            username: changes.username.as_deref().map(Username::parse).transpose()?,
            email: changes.email.as_deref().map(Email::parse).transpose()?,
            ..AccountUpdate::default()
        };
        if let Some(password) = changes.password {
            validate_password(&password)?;
            update.password_hash = Some(hash_password(password).await?);
        }
        if update.is_empty() {
            return self.find(username).await;
        }

        let account = self.apply(username, update).await?;
        tracing::info!(username = %account.username, "Profile updated");
        Ok(account)
    }

    /// Link a wallet identifier to the account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidInput` for an empty wallet id and
    /// `AccountError::NotFound` if the account does not exist.
    #[instrument(skip(self))]
    pub async fn link_wallet(
        &self,
        username: &Username,
        wallet_id: &str,
    ) -> Result<Account, AccountError> {
        let wallet_id = wallet_id.trim();
        if wallet_id.is_empty() {
            return Err(AccountError::InvalidInput("wallet id is required".into()));
        }
        self.apply(
            username,
            AccountUpdate {
                wallet_id: Some(wallet_id.to_owned()),
                ..AccountUpdate::default()
            },
        )
        .await
    }

    /// File an application to become a creator.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidInput` if a required field is blank or
    /// more than [`MAX_SOCIAL_LINKS`] links are given.
    #[instrument(skip(self, form))]
    pub async fn submit_creator_application(
        &self,
        username: &Username,
        form: CreatorApplicationForm,
    ) -> Result<CreatorApplication, AccountError> {
        let creator_name = required(&form.creator_name, "creator name")?;
        let website = required(&form.website, "website")?;
        let reason = required(&form.reason, "reason")?;
        let social_links: Vec<String> = form
            .social_links
            .iter()
            .map(|link| link.trim())
            .filter(|link| !link.is_empty())
            .map(str::to_owned)
            .collect();
        if social_links.len() > MAX_SOCIAL_LINKS {
            return Err(AccountError::InvalidInput(format!(
                "at most {MAX_SOCIAL_LINKS} social links are allowed"
            )));
        }

        let application = self
            .store
            .insert_creator_application(NewCreatorApplication {
                username: username.clone(),
                creator_name,
                website,
                social_links,
                reason,
            })
            .await?;
        tracing::info!(username = %username, application = %application.id, "Creator application submitted");
        Ok(application)
    }

    async fn find(&self, username: &Username) -> Result<Account, AccountError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or(AccountError::NotFound)
    }

    async fn apply(
        &self,
        username: &Username,
        update: AccountUpdate,
    ) -> Result<Account, AccountError> {
        self.store
            .update_account(username, update)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AccountError::NotFound,
                other => duplicate_on_conflict(other),
            })
    }
}

fn required(value: &str, field: &str) -> Result<String, AccountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AccountError::InvalidInput(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

fn random_reset_value() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_VALUE_LENGTH)
        .map(char::from)
        .collect()
}

/// Compare two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::email::MemoryNotifier;
    use crate::store::{AccountStore, MemoryStore};

    const SECRET: &str = "k9Vq2xLm7Rt4Zp8Wn3Yb6Hc1Jd5Fg0Ts";
    const ADMIN_CODE: &str = "Qm7#vT2!pL9@xR4$";

    struct Harness {
        store: Arc<MemoryStore>,
        notifier: Arc<MemoryNotifier>,
        tokens: TokenService,
        service: AccountService,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let tokens = TokenService::new(&SecretString::from(SECRET));
        let codes = SignupCodes {
            admin: Some(SecretString::from(ADMIN_CODE)),
            creator: None,
        };
        let service = AccountService::new(
            store.clone(),
            tokens.clone(),
            notifier.clone(),
            "https://mintgate.test/",
            "https://app.mintgate.test/",
            codes,
        );
        Harness {
            store,
            notifier,
            tokens,
            service,
        }
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_owned(),
            email: email.to_owned(),
            password: SecretString::from("correct horse"),
            privilege: None,
        }
    }

    fn pw(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[tokio::test]
    async fn test_register_sends_verification_link() {
        let h = harness();
        let account = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();

        assert_eq!(account.account_type, AccountType::User);
        assert!(!account.email_verified);
        assert_ne!(account.password_hash, "correct horse");

        let sent = h.notifier.sent_to(&account.email);
        assert_eq!(sent.len(), 1);
        assert!(sent[0]
            .text
            .contains("https://mintgate.test/api/auth/verify_email?token="));
    }

    #[tokio::test]
    async fn test_register_duplicate_identity() {
        let h = harness();
        h.service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();

        let same_name = h
            .service
            .register(registration("alice", "other@mintgate.test"))
            .await;
        assert!(matches!(same_name, Err(AccountError::DuplicateIdentity)));

        let same_email = h
            .service
            .register(registration("alice2", "alice@mintgate.test"))
            .await;
        assert!(matches!(same_email, Err(AccountError::DuplicateIdentity)));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let h = harness();
        let bad_email = h.service.register(registration("alice", "not-an-email")).await;
        assert!(matches!(bad_email, Err(AccountError::InvalidInput(_))));

        let mut weak = registration("alice", "alice@mintgate.test");
        weak.password = pw("short");
        assert!(matches!(
            h.service.register(weak).await,
            Err(AccountError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_privileged_signup_requires_matching_code() {
        let h = harness();

        let mut admin = registration("root", "root@mintgate.test");
        admin.privilege = Some(Privilege {
            account_type: AccountType::Admin,
            signup_code: pw(ADMIN_CODE),
        });
        let account = h.service.register(admin).await.unwrap();
        assert_eq!(account.account_type, AccountType::Admin);

        let mut wrong = registration("eve", "eve@mintgate.test");
        wrong.privilege = Some(Privilege {
            account_type: AccountType::Admin,
            signup_code: pw("guessed-code-123"),
        });
        assert!(matches!(
            h.service.register(wrong).await,
            Err(AccountError::Forbidden(_))
        ));

        // No creator code configured: the path is closed.
        let mut creator = registration("carol", "carol@mintgate.test");
        creator.privilege = Some(Privilege {
            account_type: AccountType::Creator,
            signup_code: pw(ADMIN_CODE),
        });
        assert!(matches!(
            h.service.register(creator).await,
            Err(AccountError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_password_pattern_grants_nothing() {
        let h = harness();
        let mut reg = registration("sneaky", "sneaky@mintgate.test");
        reg.password = pw("x$admin-please$x");
        let account = h.service.register(reg).await.unwrap();
        assert_eq!(account.account_type, AccountType::User);
    }

    #[tokio::test]
    async fn test_login_flow() {
        let h = harness();
        let account = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();

        assert!(matches!(
            h.service.login("alice", pw("correct horse")).await,
            Err(AccountError::EmailNotVerified)
        ));
        assert!(matches!(
            h.service.login("alice", pw("wrong horse")).await,
            Err(AccountError::BadPassword)
        ));
        assert!(matches!(
            h.service.login("nobody", pw("correct horse")).await,
            Err(AccountError::NotFound)
        ));

        let alice = Username::parse("alice").unwrap();
        let verify = token_from(&h.notifier, &account.email);
        h.service.verify_email(&verify).await.unwrap();
        // Idempotent.
        h.service.verify_email(&verify).await.unwrap();

        let session = h.service.login("alice", pw("correct horse")).await.unwrap();
        let verified = h.tokens.verify(&session, TokenKind::Session).unwrap();
        assert_eq!(verified.subject, alice);
        let owner = h.service.token_owner(&verified).await.unwrap().unwrap();
        assert_eq!(owner.id, account.id);
    }

    #[tokio::test]
    async fn test_verify_email_rejects_session_token() {
        let h = harness();
        h.service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        let session = h
            .tokens
            .issue(
                &Username::parse("alice").unwrap(),
                TokenKind::Session,
                chrono::Duration::hours(1),
            )
            .unwrap();
        assert!(matches!(
            h.service.verify_email(&session).await,
            Err(AccountError::InvalidToken(_))
        ));
    }

    /// The `token=` value from the newest message sent to `email`.
    fn token_from(notifier: &MemoryNotifier, email: &Email) -> String {
        let message = notifier.sent_to(email).pop().unwrap();
        message
            .text
            .split("token=")
            .nth(1)
            .unwrap()
            .split_whitespace()
            .next()
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn test_reset_password_single_use() {
        let h = harness();
        let account = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        h.store.set_email_verified(&account.username).await.unwrap();

        h.service
            .request_password_reset("alice@mintgate.test")
            .await
            .unwrap();
        let token = token_from(&h.notifier, &account.email);

        h.service
            .reset_password(&token, pw("new password 1"))
            .await
            .unwrap();
        assert!(h.service.login("alice", pw("new password 1")).await.is_ok());

        assert!(matches!(
            h.service.reset_password(&token, pw("new password 2")).await,
            Err(AccountError::InvalidOrExpired)
        ));
        assert!(h.service.login("alice", pw("new password 1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_weak_password_does_not_consume_reset() {
        let h = harness();
        let account = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        h.service
            .request_password_reset("alice@mintgate.test")
            .await
            .unwrap();
        let token = token_from(&h.notifier, &account.email);

        assert!(matches!(
            h.service.reset_password(&token, pw("short")).await,
            Err(AccountError::InvalidInput(_))
        ));
        assert!(h.service.reset_password(&token, pw("long enough")).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_unknown_email_creates_nothing() {
        let h = harness();
        h.service
            .request_password_reset("ghost@nowhere.test")
            .await
            .unwrap();
        assert!(h.store.reset_tokens().is_empty());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reset_token_needs_persisted_row() {
        let h = harness();
        h.service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        let alice = Username::parse("alice").unwrap();

        // Validly signed but no matching row: guard 2 rejects it.
        let forged = h
            .tokens
            .issue_with_id(&alice, TokenKind::PasswordReset, chrono::Duration::hours(1), "made-up")
            .unwrap();
        assert!(matches!(
            h.service.reset_password(&forged, pw("long enough")).await,
            Err(AccountError::InvalidOrExpired)
        ));

        // No jti at all.
        let bare = h
            .tokens
            .issue(&alice, TokenKind::PasswordReset, chrono::Duration::hours(1))
            .unwrap();
        assert!(matches!(
            h.service.reset_password(&bare, pw("long enough")).await,
            Err(AccountError::InvalidOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_reset_link_points_at_app() {
        let h = harness();
        let account = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        h.service
            .request_password_reset("alice@mintgate.test")
            .await
            .unwrap();

        let message = h.notifier.sent_to(&account.email).pop().unwrap();
        assert!(message
            .text
            .contains("https://app.mintgate.test/reset_password?token="));
    }

    async fn rename(h: &Harness, from: &str, to: &str) {
        h.service
            .update_profile(
                &Username::parse(from).unwrap(),
                ProfileChanges {
                    username: Some(to.to_owned()),
                    ..ProfileChanges::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_token_does_not_follow_username() {
        let h = harness();
        let first = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        h.service
            .request_password_reset("alice@mintgate.test")
            .await
            .unwrap();
        let token = token_from(&h.notifier, &first.email);

        rename(&h, "alice", "alice2").await;
        let second = h
            .service
            .register(registration("alice", "second@mintgate.test"))
            .await
            .unwrap();

        assert!(matches!(
            h.service.reset_password(&token, pw("taken over pw")).await,
            Err(AccountError::InvalidOrExpired)
        ));
        let stored = h
            .store
            .find_by_username(&second.username)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.password_hash, second.password_hash);
        assert!(h.store.reset_tokens().iter().all(|row| !row.used));
    }

    #[tokio::test]
    async fn test_verification_token_does_not_follow_username() {
        let h = harness();
        let first = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        let token = token_from(&h.notifier, &first.email);

        rename(&h, "alice", "alice2").await;
        let second = h
            .service
            .register(registration("alice", "second@mintgate.test"))
            .await
            .unwrap();

        assert!(matches!(
            h.service.verify_email(&token).await,
            Err(AccountError::NotFound)
        ));
        let stored = h
            .store
            .find_by_username(&second.username)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.email_verified);
    }

    #[tokio::test]
    async fn test_session_does_not_follow_username() {
        let h = harness();
        let first = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        let session = h.service.issue_session(&first).unwrap();

        rename(&h, "alice", "alice2").await;
        h.service
            .register(registration("alice", "second@mintgate.test"))
            .await
            .unwrap();

        let verified = h.tokens.verify(&session, TokenKind::Session).unwrap();
        assert!(h.service.token_owner(&verified).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_password_write_keeps_reset_usable() {
        let h = harness();
        let account = h
            .service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        h.store.set_email_verified(&account.username).await.unwrap();
        h.service
            .request_password_reset("alice@mintgate.test")
            .await
            .unwrap();
        let token = token_from(&h.notifier, &account.email);

        h.store.fail_next_password_writes(1);
        let failed = h.service.reset_password(&token, pw("new password 1")).await;
        assert!(matches!(failed, Err(AccountError::Store(ref e)) if e.is_retryable()));
        assert!(h.service.login("alice", pw("correct horse")).await.is_ok());

        h.service
            .reset_password(&token, pw("new password 1"))
            .await
            .unwrap();
        assert!(h.service.login("alice", pw("new password 1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_and_wallet() {
        let h = harness();
        h.service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        let alice = Username::parse("alice").unwrap();

        let unchanged = h
            .service
            .update_profile(&alice, ProfileChanges::default())
            .await
            .unwrap();
        assert_eq!(unchanged.email.as_str(), "alice@mintgate.test");

        let updated = h
            .service
            .update_profile(
                &alice,
                ProfileChanges {
                    email: Some("alice@new.test".to_owned()),
                    ..ProfileChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, alice);
        assert_eq!(updated.email.as_str(), "alice@new.test");

        assert!(matches!(
            h.service.link_wallet(&alice, "   ").await,
            Err(AccountError::InvalidInput(_))
        ));
        let linked = h.service.link_wallet(&alice, "0xabc123").await.unwrap();
        assert_eq!(linked.wallet_id.as_deref(), Some("0xabc123"));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_username() {
        let h = harness();
        h.service
            .register(registration("alice", "alice@mintgate.test"))
            .await
            .unwrap();
        h.service
            .register(registration("bob", "bob@mintgate.test"))
            .await
            .unwrap();

        let result = h
            .service
            .update_profile(
                &Username::parse("bob").unwrap(),
                ProfileChanges {
                    username: Some("alice".to_owned()),
                    ..ProfileChanges::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::DuplicateIdentity)));
    }

    #[tokio::test]
    async fn test_creator_application_validation() {
        let h = harness();
        let alice = Username::parse("alice").unwrap();
        let form = CreatorApplicationForm {
            creator_name: "Alice Beats".to_owned(),
            website: "https://alice.test".to_owned(),
            social_links: vec!["https://x.test/alice".to_owned(), String::new()],
            reason: "Releasing my first EP".to_owned(),
        };

        let application = h
            .service
            .submit_creator_application(&alice, form.clone())
            .await
            .unwrap();
        assert_eq!(application.social_links, vec!["https://x.test/alice"]);

        let mut blank = form.clone();
        blank.reason = "  ".to_owned();
        assert!(matches!(
            h.service.submit_creator_application(&alice, blank).await,
            Err(AccountError::InvalidInput(_))
        ));

        let mut too_many = form;
        too_many.social_links = vec!["a".into(), "b".into(), "c".into()];
        assert!(matches!(
            h.service.submit_creator_application(&alice, too_many).await,
            Err(AccountError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_random_reset_value() {
        let a = random_reset_value();
        assert_eq!(a.len(), RESET_VALUE_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, random_reset_value());
    }
}
