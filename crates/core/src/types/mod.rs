//! Core types for Mintgate.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod account;
pub mod email;
pub mod id;
pub mod price;
pub mod status;
pub mod token;

pub use account::{AccountType, AccountTypeError, Username, UsernameError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use status::TransactionStatus;
pub use token::{TokenKind, TokenKindError};
