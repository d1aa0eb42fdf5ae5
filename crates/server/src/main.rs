//! Mintgate server - account, verification and approval-workflow API.
//!
//! This binary serves the JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, bearer session tokens (HS256)
//! - `PostgreSQL` for accounts, pending submissions, the mint queue and the
//!   marketplace
//! - SMTP for verification, reset and decline notices (logged when unset)
//! - Local upload directory for KYC documents and release media
//!
//! # Security
//!
//! Only release media is served back over HTTP. KYC documents stay on disk
//! and are referenced from the pending submission.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mintgate_server::config::ServerConfig;
use mintgate_server::db::{self, PgStore};
use mintgate_server::routes;
use mintgate_server::services::email::{LogNotifier, Notifier, SmtpNotifier};
use mintgate_server::services::uploads::{LocalBlobStore, RELEASE_CONTAINER};
use mintgate_server::state::{AppState, Backends};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mintgate_server=info,audit=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p mintgate-cli -- migrate

    let store = Arc::new(PgStore::new(pool, config.store_timeout));

    let notifier: Arc<dyn Notifier> = match &config.email {
        Some(email) => Arc::new(SmtpNotifier::new(email).expect("Failed to configure SMTP")),
        None => {
            tracing::warn!("SMTP_HOST not set; notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let uploader = Arc::new(LocalBlobStore::new(
        config.upload_dir.clone(),
        &config.base_url,
    ));

    let backends = Backends {
        credentials: store.clone(),
        marketplace: store.clone(),
        mint_queue: store,
        notifier,
        uploader,
    };
    let state = AppState::new(config.clone(), backends);

    let app = routes::router(state, true)
        .nest_service(
            "/uploads/release-request",
            ServeDir::new(config.upload_dir.join(RELEASE_CONTAINER)),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("mintgate-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
