pub mod account;
pub mod migrate;

use secrecy::SecretString;

/// Read the database URL the server uses.
pub fn database_url() -> Result<SecretString, MissingEnvVar> {
    dotenvy::dotenv().ok();
    std::env::var("MINTGATE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingEnvVar("MINTGATE_DATABASE_URL"))
}

#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);
