//! Bearer-token extractors.
//!
//! Handlers declare what they need in their signature:
//!
//! ```rust,ignore
//! async fn profile(RequireSession(username): RequireSession) -> ... { }
//! async fn approve(RequireAdmin(admin): RequireAdmin) -> ... { }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use mintgate_core::{TokenKind, Username};

use crate::error::{AppError, set_sentry_user};
use crate::models::Account;
use crate::state::AppState;

/// Extractor that requires a valid session token.
pub struct RequireSession(pub Username);

/// Extractor that requires a session for an account that still exists.
pub struct RequireAccount(pub Account);

/// Extractor that requires a session for an admin account.
pub struct RequireAdmin(pub Account);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("missing bearer token".to_string()))
}

/// Resolve the bearer session to the account it was issued for. A session
/// whose username now belongs to another account is rejected.
async fn session_account(parts: &Parts, state: &AppState) -> Result<Account, AppError> {
    let token = bearer_token(parts)?;
    let verified = state
        .tokens()
        .verify(token, TokenKind::Session)
        .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

    let account = state
        .accounts()
        .token_owner(&verified)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("account no longer exists".to_string()))?;

    tracing::Span::current().record("username", account.username.as_str());
    set_sentry_user(&account.username);
    Ok(account)
}

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_account(parts, state)
            .await
            .map(|account| Self(account.username))
    }
}

impl FromRequestParts<AppState> for RequireAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_account(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAccount(account) = RequireAccount::from_request_parts(parts, state).await?;
        if !account.account_type.is_reviewer() {
            tracing::warn!(username = %account.username, "Reviewer endpoint refused");
            return Err(AppError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(account))
    }
}
