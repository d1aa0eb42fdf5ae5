//! Mintgate server library.
//!
//! Credential handling, KYC and release approval workflows, and the
//! marketplace API. The binary in `main.rs` wires these to `PostgreSQL`,
//! SMTP and the local upload directory; tests wire them to the in-memory
//! backends instead.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod tokens;
