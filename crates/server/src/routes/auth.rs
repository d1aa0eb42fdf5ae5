//! Credential endpoints: signup, login, email verification, password reset.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use mintgate_core::TokenKind;

use crate::error::Result;
use crate::models::Profile;
use crate::services::accounts::{Privilege, Registration};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    #[serde(default)]
    pub privilege: Option<Privilege>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl SessionResponse {
    #[must_use]
    pub fn bearer(token: String) -> Self {
        Self {
            token,
            token_type: "Bearer",
            expires_in: TokenKind::Session.default_ttl().num_seconds(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: SecretString,
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Profile>)> {
    let account = state
        .accounts()
        .register(Registration {
            username: request.username,
            email: request.email,
            password: request.password,
            privilege: request.privilege,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(Profile::from(&account))))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let token = state
        .accounts()
        .login(&request.username, request.password)
        .await?;
    Ok(Json(SessionResponse::bearer(token)))
}

/// GET /api/auth/verify_email?token=...
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<Value>> {
    state.accounts().verify_email(&query.token).await?;
    Ok(Json(json!({ "verified": true })))
}

/// POST /api/auth/forgot_password
///
/// Responds the same way whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    state
        .accounts()
        .request_password_reset(&request.email)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "If an account uses that address, a reset link is on its way"
        })),
    ))
}

/// POST /api/auth/reset_password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    state
        .accounts()
        .reset_password(&request.token, request.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password updated" })))
}
