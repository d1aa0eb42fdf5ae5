//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (store ping)
//!
//! # Auth (rate limited)
//! POST /api/auth/signup                 - Register an account
//! POST /api/auth/login                  - Exchange credentials for a session token
//! GET  /api/auth/verify_email?token=    - Confirm an email address
//! POST /api/auth/forgot_password        - Email a reset link
//! POST /api/auth/reset_password         - Consume a reset link
//!
//! # Account (session)
//! GET  /api/account/profile             - Current profile
//! PUT  /api/account/update              - Change username, email or password
//! PUT  /api/account/wallet              - Link a wallet
//! POST /api/account/creator_application - Apply for a creator account
//!
//! # KYC
//! POST /api/kyc                         - Submit (session, multipart)
//! GET  /api/kyc/pending                 - Pending submissions (admin)
//! POST /api/kyc/{id}/approve            - Approve (admin)
//! POST /api/kyc/{id}/decline            - Decline (admin)
//!
//! # Releases
//! POST /api/releases                    - Submit (creator or admin, multipart)
//! GET  /api/releases/pending            - Pending submissions (admin)
//! POST /api/releases/{id}/approve       - Approve and enqueue mint (admin)
//! POST /api/releases/{id}/decline       - Decline (admin)
//!
//! # Marketplace
//! GET  /api/marketplace/listings        - All listings
//! POST /api/marketplace/listings        - Create listing (session)
//! POST /api/marketplace/transactions    - Record a transaction (session)
//! ```

pub mod account;
pub mod auth;
pub mod form;
pub mod kyc;
pub mod marketplace;
pub mod releases;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Multipart bodies carry up to two files plus text fields.
const SUBMISSION_BODY_LIMIT: usize = 2 * form::MAX_FILE_BYTES + 1024 * 1024;

/// Create the credential routes router.
pub fn auth_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/verify_email", get(auth::verify_email))
        .route("/forgot_password", post(auth::forgot_password))
        .route("/reset_password", post(auth::reset_password));

    if rate_limited {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(account::profile))
        .route("/update", put(account::update))
        .route("/wallet", put(account::link_wallet))
        .route("/creator_application", post(account::creator_application))
}

/// Create the KYC routes router.
pub fn kyc_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(kyc::submit).layer(DefaultBodyLimit::max(SUBMISSION_BODY_LIMIT)),
        )
        .route("/pending", get(kyc::pending))
        .route("/{id}/approve", post(kyc::approve))
        .route("/{id}/decline", post(kyc::decline))
}

/// Create the release routes router.
pub fn release_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(releases::submit).layer(DefaultBodyLimit::max(SUBMISSION_BODY_LIMIT)),
        )
        .route("/pending", get(releases::pending))
        .route("/{id}/approve", post(releases::approve))
        .route("/{id}/decline", post(releases::decline))
}

/// Create the marketplace routes router.
pub fn marketplace_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/listings",
            get(marketplace::listings).post(marketplace::create_listing),
        )
        .route("/transactions", post(marketplace::record_transaction))
}

/// Create all API routes.
pub fn routes(rate_limited: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes(rate_limited))
        .nest("/api/account", account_routes())
        .nest("/api/kyc", kyc_routes())
        .nest("/api/releases", release_routes())
        .nest("/api/marketplace", marketplace_routes())
}

/// Build the full application with state, request IDs and tracing applied.
///
/// The binary adds static file serving and the Sentry layers on top.
pub fn router(state: AppState, rate_limited: bool) -> Router {
    routes(rate_limited)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.credentials().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
