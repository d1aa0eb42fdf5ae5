//! Marketplace records and the downstream mint job.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mintgate_core::{ListingId, Price, ReleaseSubmissionId, TransactionId, TransactionStatus};

/// Work item handed to the minting pipeline when a release is approved.
///
/// `source_release` makes enqueueing idempotent: a second job for the same
/// submission is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintJob {
    pub source_release: ReleaseSubmissionId,
    pub release_name: String,
    pub owner_address: String,
}

/// A marketplace listing.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub id: ListingId,
    pub release_name: String,
    pub seller_address: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub listed_at: DateTime<Utc>,
}

/// Input for a listing.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub release_name: String,
    pub seller_address: String,
    pub price: Price,
    pub image_url: Option<String>,
}

/// A recorded marketplace transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub client_id: String,
    pub transaction_type: String,
    pub items_sent: String,
    pub items_received: String,
    pub notes: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for a transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub client_id: String,
    pub transaction_type: String,
    pub items_sent: String,
    pub items_received: String,
    pub notes: String,
}
