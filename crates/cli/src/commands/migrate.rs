//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mintgate-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MINTGATE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time.

use thiserror::Error;

use mintgate_server::db;

use super::{MissingEnvVar, database_url};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Env(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
