//! KYC submission and review endpoints.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use mintgate_core::{Email, KycSubmissionId};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAccount, RequireAdmin};
use crate::models::{KycDetails, KycSubmission, NewKycSubmission};
use crate::routes::form::SubmissionForm;
use crate::services::uploads::KYC_CONTAINER;
use crate::state::AppState;

/// Optional decline body.
#[derive(Debug, Default, Deserialize)]
pub struct DeclineRequest {
    pub notify_contact: Option<String>,
}

impl DeclineRequest {
    /// Parse an optional JSON body; an empty body means no override.
    pub fn from_body(body: &Bytes) -> Result<Option<Email>> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("invalid decline body: {e}")))?;
        request
            .notify_contact
            .map(|contact| {
                Email::parse(&contact)
                    .map_err(|e| AppError::BadRequest(format!("invalid notify_contact: {e}")))
            })
            .transpose()
    }
}

/// POST /api/kyc
///
/// Multipart fields: `legal_name`, `address`, `country`, `email`, `phone`,
/// `date_of_birth` (YYYY-MM-DD), and files `document` and `face_image`.
pub async fn submit(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    let mut form = SubmissionForm::read(multipart).await?;

    let legal_name = form.text("legal_name")?;
    let address = form.text("address")?;
    let country = form.text("country")?;
    let email = Email::parse(&form.text("email")?)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;
    let phone = form.text("phone")?;
    let date_of_birth: NaiveDate = form.parse("date_of_birth")?;
    let document = form.take_file("document")?;
    let face_image = form.take_file("face_image")?;

    let owner = account.username.as_str();
    let uploader = state.uploader();
    let document_ref = uploader
        .upload(KYC_CONTAINER, owner, document.bytes, &document.file_name)
        .await?;
    let face_image_ref = uploader
        .upload(KYC_CONTAINER, owner, face_image.bytes, &face_image.file_name)
        .await?;

    let id = state
        .kyc()
        .submit(NewKycSubmission {
            username: account.username,
            details: KycDetails {
                legal_name,
                address,
                country,
                email,
                phone,
                date_of_birth,
                document_ref,
                face_image_ref,
            },
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// GET /api/kyc/pending
pub async fn pending(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<KycSubmission>>> {
    Ok(Json(state.kyc().list().await?))
}

/// POST /api/kyc/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<KycSubmissionId>,
) -> Result<Json<Value>> {
    tracing::info!(target: "audit", reviewer = %admin.username, id = %id, "KYC approval requested");
    state.kyc().approve(id).await?;
    Ok(Json(json!({ "id": id, "status": "approved" })))
}

/// POST /api/kyc/{id}/decline
///
/// Optional body: `{"notify_contact": "..."}`. Defaults to the email on the
/// submission.
pub async fn decline(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<KycSubmissionId>,
    body: Bytes,
) -> Result<Json<Value>> {
    let contact = DeclineRequest::from_body(&body)?;
    tracing::info!(target: "audit", reviewer = %admin.username, id = %id, "KYC decline requested");
    state.kyc().decline(id, contact).await?;
    Ok(Json(json!({ "id": id, "status": "declined" })))
}
