//! Marketplace listings and transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mintgate_core::{ListingId, Price, TransactionId, TransactionStatus};

use super::PgStore;
use crate::models::{Listing, NewListing, NewTransaction, Transaction};
use crate::store::{MarketplaceStore, StoreError};

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: ListingId,
    release_name: String,
    seller_address: String,
    price: Price,
    image_url: Option<String>,
    listed_at: DateTime<Utc>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        Self {
            id: row.id,
            release_name: row.release_name,
            seller_address: row.seller_address,
            price: row.price,
            image_url: row.image_url,
            listed_at: row.listed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: TransactionId,
    client_id: String,
    transaction_type: String,
    items_sent: String,
    items_received: String,
    notes: String,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: row.id,
            client_id: row.client_id,
            transaction_type: row.transaction_type,
            items_sent: row.items_sent,
            items_received: row.items_received,
            notes: row.notes,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ListingRow>(
                r"
                INSERT INTO listings (release_name, seller_address, price, image_url)
                VALUES ($1, $2, $3, $4)
                RETURNING id, release_name, seller_address, price, image_url, listed_at
                ",
            )
            .bind(&listing.release_name)
            .bind(&listing.seller_address)
            .bind(listing.price)
            .bind(listing.image_url.as_deref())
            .fetch_one(&self.pool)
            .await?;
            Ok::<_, StoreError>(row.into())
        })
        .await
    }

    async fn list_listings(&self) -> Result<Vec<Listing>, StoreError> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, ListingRow>(
                r"
                SELECT id, release_name, seller_address, price, image_url, listed_at
                FROM listings
                ORDER BY listed_at DESC, id DESC
                ",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok::<_, StoreError>(rows.into_iter().map(Listing::from).collect())
        })
        .await
    }

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, TransactionRow>(
                r"
                INSERT INTO transactions
                    (client_id, transaction_type, items_sent, items_received, notes)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, client_id, transaction_type, items_sent, items_received,
                          notes, status, created_at
                ",
            )
            .bind(&transaction.client_id)
            .bind(&transaction.transaction_type)
            .bind(&transaction.items_sent)
            .bind(&transaction.items_received)
            .bind(&transaction.notes)
            .fetch_one(&self.pool)
            .await?;
            Ok::<_, StoreError>(row.into())
        })
        .await
    }
}
