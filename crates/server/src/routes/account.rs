//! Session-scoped account endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::middleware::RequireSession;
use crate::models::{CreatorApplication, Profile};
use crate::routes::auth::SessionResponse;
use crate::services::accounts::{CreatorApplicationForm, ProfileChanges};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub profile: Profile,
    /// Present when the username changed; earlier sessions name the old one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionResponse>,
}

#[derive(Debug, Deserialize)]
pub struct WalletRequest {
    pub wallet_id: String,
}

/// GET /api/account/profile
pub async fn profile(
    State(state): State<AppState>,
    RequireSession(username): RequireSession,
) -> Result<Json<Profile>> {
    Ok(Json(state.accounts().profile(&username).await?))
}

/// PUT /api/account/update
pub async fn update(
    State(state): State<AppState>,
    RequireSession(username): RequireSession,
    Json(changes): Json<ProfileChanges>,
) -> Result<Json<UpdateResponse>> {
    let account = state.accounts().update_profile(&username, changes).await?;
    let session = if account.username == username {
        None
    } else {
        Some(SessionResponse::bearer(
            state.accounts().issue_session(&account)?,
        ))
    };
    Ok(Json(UpdateResponse {
        profile: Profile::from(&account),
        session,
    }))
}

/// PUT /api/account/wallet
pub async fn link_wallet(
    State(state): State<AppState>,
    RequireSession(username): RequireSession,
    Json(request): Json<WalletRequest>,
) -> Result<Json<Profile>> {
    let account = state
        .accounts()
        .link_wallet(&username, &request.wallet_id)
        .await?;
    Ok(Json(Profile::from(&account)))
}

/// POST /api/account/creator_application
pub async fn creator_application(
    State(state): State<AppState>,
    RequireSession(username): RequireSession,
    Json(form): Json<CreatorApplicationForm>,
) -> Result<(StatusCode, Json<CreatorApplication>)> {
    let application = state
        .accounts()
        .submit_creator_application(&username, form)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}
