//! Account identity types: usernames and account types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// Shorter than the minimum length.
    #[error("username must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// Longer than the maximum length.
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Contains a character outside `[A-Za-z0-9_.-]`.
    #[error("username may only contain letters, digits, '_', '.' and '-'")]
    InvalidCharacter,
}

/// A unique, human-chosen account handle.
///
/// Usernames are the subject of every signed token and the owner key for
/// uploads and mint jobs, so the character set is deliberately narrow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Minimum username length.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum username length.
    pub const MAX_LENGTH: usize = 32;

    /// Parse a `Username`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is outside the length bounds or
    /// contains characters other than ASCII letters, digits, `_`, `.` or `-`.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        let s = s.trim();
        if s.len() < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(UsernameError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error returned when an account type string is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown account type: {0}")]
pub struct AccountTypeError(pub String);

/// Permission tier of an account.
///
/// `User` is the default for every self-service signup. `Creator` may submit
/// releases; `Admin` may review KYC and release submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    User,
    Creator,
    Admin,
}

impl AccountType {
    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Creator => "creator",
            Self::Admin => "admin",
        }
    }

    /// Whether this account may submit releases for minting.
    #[must_use]
    pub const fn can_submit_releases(self) -> bool {
        matches!(self, Self::Creator | Self::Admin)
    }

    /// Whether this account may review pending submissions.
    #[must_use]
    pub const fn is_reviewer(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = AccountTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "creator" => Ok(Self::Creator),
            "admin" => Ok(Self::Admin),
            other => Err(AccountTypeError(other.to_owned())),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Username {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Username {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Username {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

// Stored as TEXT so the column stays readable from psql.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for AccountType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for AccountType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for AccountType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_username_valid() {
        assert_eq!(Username::parse(" alice ").unwrap().as_str(), "alice");
        assert!(Username::parse("bob_the-builder.42").is_ok());
    }

    #[test]
    fn test_username_length_bounds() {
        assert!(matches!(
            Username::parse("ab"),
            Err(UsernameError::TooShort { min: 3 })
        ));
        assert!(matches!(
            Username::parse(&"x".repeat(33)),
            Err(UsernameError::TooLong { max: 32 })
        ));
    }

    #[test]
    fn test_username_rejects_symbols() {
        assert_eq!(
            Username::parse("x$admin"),
            Err(UsernameError::InvalidCharacter)
        );
        assert_eq!(
            Username::parse("a b c"),
            Err(UsernameError::InvalidCharacter)
        );
    }

    #[test]
    fn test_account_type_roundtrip() {
        for ty in [AccountType::User, AccountType::Creator, AccountType::Admin] {
            assert_eq!(ty.as_str().parse::<AccountType>().unwrap(), ty);
        }
        assert!("root".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_account_type_permissions() {
        assert!(!AccountType::User.can_submit_releases());
        assert!(AccountType::Creator.can_submit_releases());
        assert!(!AccountType::Creator.is_reviewer());
        assert!(AccountType::Admin.is_reviewer());
    }

    #[test]
    fn test_account_type_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&AccountType::Creator).unwrap(),
            "\"creator\""
        );
    }
}
