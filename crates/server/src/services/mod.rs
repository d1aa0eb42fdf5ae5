//! Business logic services.
//!
//! # Services
//!
//! - `accounts` - Registration, login, email verification, password reset
//! - `approval` - KYC and release review workflows
//! - `marketplace` - Listings and transaction records
//! - `email` - Outgoing notifications
//! - `uploads` - Blob storage for submitted documents and media

pub mod accounts;
pub mod approval;
pub mod email;
pub mod marketplace;
pub mod uploads;
