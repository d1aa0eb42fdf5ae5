//! Marketplace listings and transaction records.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use mintgate_core::{Price, PriceError};

use crate::models::{Listing, NewListing, NewTransaction, Transaction};
use crate::store::{MarketplaceStore, StoreError};

/// Errors that can occur in marketplace operations.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<PriceError> for MarketplaceError {
    fn from(err: PriceError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Listing input.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingForm {
    pub release_name: String,
    pub seller_address: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Transaction input.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionForm {
    pub client_id: String,
    pub transaction_type: String,
    pub items_sent: String,
    pub items_received: String,
    #[serde(default)]
    pub notes: String,
}

/// Marketplace operations over a [`MarketplaceStore`].
#[derive(Clone)]
pub struct MarketplaceService {
    store: Arc<dyn MarketplaceStore>,
}

impl MarketplaceService {
    #[must_use]
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// List an item for sale.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::InvalidInput` for a blank name or seller,
    /// or a price that is not positive.
    #[instrument(skip(self, form), fields(release = %form.release_name))]
    pub async fn create_listing(&self, form: ListingForm) -> Result<Listing, MarketplaceError> {
        let release_name = required(&form.release_name, "release name")?;
        let seller_address = required(&form.seller_address, "seller address")?;
        let price = Price::new(form.price)?;
        let image_url = form
            .image_url
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty());

        let listing = self
            .store
            .insert_listing(NewListing {
                release_name,
                seller_address,
                price,
                image_url,
            })
            .await?;
        tracing::info!(listing = %listing.id, price = %listing.price, "Listing created");
        Ok(listing)
    }

    /// All listings, newest first.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::Store` if the read fails.
    pub async fn list_listings(&self) -> Result<Vec<Listing>, MarketplaceError> {
        Ok(self.store.list_listings().await?)
    }

    /// Record a transaction. New records start as pending.
    ///
    /// # Errors
    ///
    /// Returns `MarketplaceError::InvalidInput` if a required field is blank.
    #[instrument(skip(self, form), fields(client = %form.client_id))]
    pub async fn record_transaction(
        &self,
        form: TransactionForm,
    ) -> Result<Transaction, MarketplaceError> {
        let transaction = self
            .store
            .insert_transaction(NewTransaction {
                client_id: required(&form.client_id, "client id")?,
                transaction_type: required(&form.transaction_type, "transaction type")?,
                items_sent: form.items_sent.trim().to_owned(),
                items_received: form.items_received.trim().to_owned(),
                notes: form.notes.trim().to_owned(),
            })
            .await?;
        tracing::info!(transaction = %transaction.id, "Transaction recorded");
        Ok(transaction)
    }
}

fn required(value: &str, field: &str) -> Result<String, MarketplaceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MarketplaceError::InvalidInput(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use mintgate_core::TransactionStatus;

    use super::*;
    use crate::store::MemoryStore;

    fn service() -> MarketplaceService {
        MarketplaceService::new(Arc::new(MemoryStore::new()))
    }

    fn listing(name: &str, price: &str) -> ListingForm {
        ListingForm {
            release_name: name.to_owned(),
            seller_address: "0xseller".to_owned(),
            price: Decimal::from_str(price).unwrap(),
            image_url: Some("  ".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_listings_newest_first() {
        let market = service();
        market.create_listing(listing("EP1", "10.50")).await.unwrap();
        let second = market.create_listing(listing("EP2", "0.01")).await.unwrap();
        assert_eq!(second.image_url, None);

        let names: Vec<_> = market
            .list_listings()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.release_name)
            .collect();
        assert_eq!(names, vec!["EP2", "EP1"]);
    }

    #[tokio::test]
    async fn test_listing_rejects_non_positive_price() {
        let market = service();
        for price in ["0", "-3"] {
            assert!(matches!(
                market.create_listing(listing("EP1", price)).await,
                Err(MarketplaceError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_transaction_defaults_to_pending() {
        let market = service();
        let tx = market
            .record_transaction(TransactionForm {
                client_id: "client-7".to_owned(),
                transaction_type: "trade".to_owned(),
                items_sent: "EP1 #3".to_owned(),
                items_received: "EP2 #9".to_owned(),
                notes: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
    }
}
