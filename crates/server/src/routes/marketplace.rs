//! Marketplace listing and transaction endpoints.

use axum::{Json, extract::State, http::StatusCode};

use crate::error::Result;
use crate::middleware::RequireSession;
use crate::models::{Listing, Transaction};
use crate::services::marketplace::{ListingForm, TransactionForm};
use crate::state::AppState;

/// GET /api/marketplace/listings
pub async fn listings(State(state): State<AppState>) -> Result<Json<Vec<Listing>>> {
    Ok(Json(state.marketplace().list_listings().await?))
}

/// POST /api/marketplace/listings
pub async fn create_listing(
    State(state): State<AppState>,
    RequireSession(_username): RequireSession,
    Json(form): Json<ListingForm>,
) -> Result<(StatusCode, Json<Listing>)> {
    let listing = state.marketplace().create_listing(form).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// POST /api/marketplace/transactions
pub async fn record_transaction(
    State(state): State<AppState>,
    RequireSession(_username): RequireSession,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<Transaction>)> {
    let transaction = state.marketplace().record_transaction(form).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}
