//! Signed, typed, expiring tokens.
//!
//! Tokens are HS256 JWTs carrying `{sub, kind, iat, exp, jti?}`. The signing
//! secret is injected once at startup and never leaves this module.
//!
//! Verification order matters: the signature is checked before any claim is
//! read, then the `kind` is matched against the consuming operation, then
//! expiry is enforced with zero leeway (`now < exp`).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mintgate_core::{TokenKind, Username};

/// Reasons a token is rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature does not match the configured secret.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// Token is past its expiry.
    #[error("token has expired")]
    Expired,

    /// Token was issued for a different purpose.
    #[error("token kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: TokenKind,
        found: TokenKind,
    },

    /// Token could not be parsed.
    #[error("token is malformed")]
    Malformed,

    /// Signing failed while issuing.
    #[error("token could not be signed")]
    Signing,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    kind: String,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
}

/// Claims of a token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: Username,
    pub kind: TokenKind,
    pub token_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenService {
    /// Build a service around `secret`.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced below without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Issue a token for `subject` that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the claims cannot be encoded.
    pub fn issue(
        &self,
        subject: &Username,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.sign(subject, kind, ttl, None)
    }

    /// Issue a token that also carries an opaque identifier in `jti`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the claims cannot be encoded.
    pub fn issue_with_id(
        &self,
        subject: &Username,
        kind: TokenKind,
        ttl: Duration,
        token_id: &str,
    ) -> Result<String, TokenError> {
        self.sign(subject, kind, ttl, Some(token_id.to_owned()))
    }

    fn sign(
        &self,
        subject: &Username,
        kind: TokenKind,
        ttl: Duration,
        jti: Option<String>,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.as_str().to_owned(),
            kind: kind.as_str().to_owned(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Signing)
    }

    /// Verify `token` for an operation that accepts `expected` tokens.
    ///
    /// # Errors
    ///
    /// Returns the first failed check: `InvalidSignature`, `Malformed`,
    /// `KindMismatch`, or `Expired`.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, expected, Utc::now())
    }

    fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, TokenError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::Malformed,
            })?
            .claims;

        let kind: TokenKind = claims.kind.parse().map_err(|_| TokenError::Malformed)?;
        if kind != expected {
            return Err(TokenError::KindMismatch {
                expected,
                found: kind,
            });
        }

        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }

        let subject = Username::parse(&claims.sub).map_err(|_| TokenError::Malformed)?;

        Ok(VerifiedToken {
            subject,
            kind,
            token_id: claims.jti,
            expires_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&SecretString::from(secret.to_owned()))
    }

    fn alice() -> Username {
        Username::parse("alice").unwrap()
    }

    const SECRET: &str = "k9Vq2xLm7Rt4Zp8Wn3Yb6Hc1Jd5Fg0Ts";

    #[test]
    fn test_issue_then_verify() {
        let tokens = service(SECRET);
        let token = tokens
            .issue(&alice(), TokenKind::Session, TokenKind::Session.default_ttl())
            .unwrap();

        let verified = tokens.verify(&token, TokenKind::Session).unwrap();
        assert_eq!(verified.subject, alice());
        assert_eq!(verified.kind, TokenKind::Session);
        assert_eq!(verified.token_id, None);
    }

    #[test]
    fn test_token_id_is_carried() {
        let tokens = service(SECRET);
        let token = tokens
            .issue_with_id(&alice(), TokenKind::PasswordReset, Duration::hours(1), "row-123")
            .unwrap();
        let verified = tokens.verify(&token, TokenKind::PasswordReset).unwrap();
        assert_eq!(verified.token_id.as_deref(), Some("row-123"));
    }

    #[test]
    fn test_other_secret_is_invalid_signature() {
        let token = service(SECRET)
            .issue(&alice(), TokenKind::Session, Duration::hours(1))
            .unwrap();
        let other = service("Zx8Qw2Er4Ty6Ui8Op0As2Df4Gh6Jk8Lz");
        assert_eq!(
            other.verify(&token, TokenKind::Session),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_is_invalid_signature() {
        let tokens = service(SECRET);
        let token = tokens
            .issue(&alice(), TokenKind::Session, Duration::hours(1))
            .unwrap();
        let forged = tokens
            .issue(&Username::parse("mallory").unwrap(), TokenKind::Session, Duration::hours(1))
            .unwrap();

        // Splice mallory's claims under alice's signature.
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        parts[1] = forged_parts[1];
        let spliced = parts.join(".");

        assert_eq!(
            tokens.verify(&spliced, TokenKind::Session),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired() {
        let tokens = service(SECRET);
        let token = tokens
            .issue(&alice(), TokenKind::Session, Duration::seconds(-5))
            .unwrap();
        assert_eq!(
            tokens.verify(&token, TokenKind::Session),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_expiry_has_no_leeway() {
        let tokens = service(SECRET);
        let token = tokens
            .issue(&alice(), TokenKind::Session, Duration::minutes(10))
            .unwrap();
        let exp = tokens
            .verify(&token, TokenKind::Session)
            .unwrap()
            .expires_at;

        assert!(tokens
            .verify_at(&token, TokenKind::Session, exp - Duration::seconds(1))
            .is_ok());
        assert_eq!(
            tokens.verify_at(&token, TokenKind::Session, exp),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let tokens = service(SECRET);
        let session = tokens
            .issue(&alice(), TokenKind::Session, Duration::hours(1))
            .unwrap();
        assert_eq!(
            tokens.verify(&session, TokenKind::PasswordReset),
            Err(TokenError::KindMismatch {
                expected: TokenKind::PasswordReset,
                found: TokenKind::Session,
            })
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let tokens = service(SECRET);
        assert_eq!(
            tokens.verify("not-a-token", TokenKind::Session),
            Err(TokenError::Malformed)
        );
        assert_eq!(tokens.verify("", TokenKind::Session), Err(TokenError::Malformed));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", service(SECRET));
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("[REDACTED]"));
    }
}
