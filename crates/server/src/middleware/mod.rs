//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting on credential endpoints (governor)
//!
//! Authentication is per-handler via the extractors in [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireAccount, RequireAdmin, RequireSession};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
