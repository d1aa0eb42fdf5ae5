//! Token kinds carried in signed tokens.

use core::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Error returned when a token kind string is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown token kind: {0}")]
pub struct TokenKindError(pub String);

/// Purpose a signed token was issued for.
///
/// A token is only accepted by the operation matching its kind, so a
/// session token can never reset a password and a reset token can never
/// authenticate a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    /// Wire representation used in the `kind` claim.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }

    /// Default lifetime of a token of this kind.
    #[must_use]
    pub const fn default_ttl(self) -> Duration {
        match self {
            Self::Session | Self::EmailVerification => Duration::hours(24),
            Self::PasswordReset => Duration::hours(1),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TokenKind {
    type Err = TokenKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(Self::Session),
            "email_verification" => Ok(Self::EmailVerification),
            "password_reset" => Ok(Self::PasswordReset),
            other => Err(TokenKindError(other.to_owned())),
        }
    }
}
