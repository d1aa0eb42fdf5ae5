//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MINTGATE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MINTGATE_BASE_URL` - Public URL of this API, used in verification links
//! - `MINTGATE_TOKEN_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `MINTGATE_HOST` - Bind address (default: 127.0.0.1)
//! - `MINTGATE_PORT` - Listen port (default: 3000)
//! - `MINTGATE_APP_URL` - Frontend that serves the `/reset_password` page
//!   reached from reset emails (default: `MINTGATE_BASE_URL`)
//! - `MINTGATE_STORE_TIMEOUT_MS` - Per-call store deadline (default: 5000)
//! - `MINTGATE_UPLOAD_DIR` - Root directory for uploaded blobs (default: uploads)
//! - `MINTGATE_ADMIN_SIGNUP_CODE` - Enables privileged admin signup
//! - `MINTGATE_CREATOR_SIGNUP_CODE` - Enables privileged creator signup
//! - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM`
//!   - Outgoing mail; when `SMTP_HOST` is unset messages are logged instead
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_SIGNUP_CODE_LENGTH: usize = 16;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public API URL, used to build verification links
    pub base_url: String,
    /// Frontend URL, used to build password reset links
    pub app_url: String,
    /// Token signing secret
    pub token_secret: SecretString,
    /// Deadline applied to every store call
    pub store_timeout: Duration,
    /// Root directory for the local blob uploader
    pub upload_dir: PathBuf,
    /// Codes that unlock privileged account types at signup
    pub signup_codes: SignupCodes,
    /// Outgoing mail; `None` logs messages instead of sending them
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

/// Privileged signup codes. A missing code disables that signup path.
#[derive(Clone, Default)]
pub struct SignupCodes {
    pub admin: Option<SecretString>,
    pub creator: Option<SecretString>,
}

impl std::fmt::Debug for SignupCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |code: &Option<SecretString>| code.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SignupCodes")
            .field("admin", &redact(&self.admin))
            .field("creator", &redact(&self.creator))
            .finish()
    }
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MINTGATE_DATABASE_URL")?;
        let host = parse_env("MINTGATE_HOST", "127.0.0.1")?;
        let port = parse_env("MINTGATE_PORT", "3000")?;
        let base_url = get_required_env("MINTGATE_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("MINTGATE_BASE_URL".to_string(), e.to_string())
        })?;
        let app_url = resolve_app_url(get_optional_env("MINTGATE_APP_URL"), &base_url)?;
        let token_secret = get_validated_secret("MINTGATE_TOKEN_SECRET")?;
        validate_min_length(&token_secret, "MINTGATE_TOKEN_SECRET", MIN_TOKEN_SECRET_LENGTH)?;
        let store_timeout =
            Duration::from_millis(parse_env("MINTGATE_STORE_TIMEOUT_MS", "5000")?);
        let upload_dir = PathBuf::from(get_env_or_default("MINTGATE_UPLOAD_DIR", "uploads"));

        let signup_codes = SignupCodes {
            admin: get_optional_signup_code("MINTGATE_ADMIN_SIGNUP_CODE")?,
            creator: get_optional_signup_code("MINTGATE_CREATOR_SIGNUP_CODE")?,
        };
        let email = EmailConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            app_url,
            token_secret,
            store_timeout,
            upload_dir,
            signup_codes,
            email,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// The frontend URL for reset links, defaulting to the API's own base URL.
fn resolve_app_url(raw: Option<String>, base_url: &str) -> Result<String, ConfigError> {
    let Some(app_url) = raw else {
        return Ok(base_url.to_string());
    };
    url::Url::parse(&app_url)
        .map_err(|e| ConfigError::InvalidEnvVar("MINTGATE_APP_URL".to_string(), e.to_string()))?;
    Ok(app_url)
}

/// Parse an environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a secret meets minimum length requirements.
fn validate_min_length(
    secret: &SecretString,
    var_name: &str,
    min_length: usize,
) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < min_length {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                min_length,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Load an optional signup code; when present it gets the secret checks.
fn get_optional_signup_code(key: &str) -> Result<Option<SecretString>, ConfigError> {
    let Some(value) = get_optional_env(key) else {
        return Ok(None);
    };
    validate_secret_strength(&value, key)?;
    let code = SecretString::from(value);
    validate_min_length(&code, key, MIN_SIGNUP_CODE_LENGTH)?;
    Ok(Some(code))
}
