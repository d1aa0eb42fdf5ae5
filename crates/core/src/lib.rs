//! Mintgate Core - Shared types library.
//!
//! This crate provides common types used across all Mintgate components:
//! - `server` - Account, verification and approval-workflow API
//! - `cli` - Command-line tools for migrations and account administration
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, usernames, emails, prices, account
//!   types and token kinds

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
