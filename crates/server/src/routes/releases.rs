//! Release submission and review endpoints.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde_json::{Value, json};

use mintgate_core::ReleaseSubmissionId;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAccount, RequireAdmin};
use crate::models::{NewReleaseSubmission, ReleaseSubmission};
use crate::routes::form::SubmissionForm;
use crate::routes::kyc::DeclineRequest;
use crate::services::uploads::RELEASE_CONTAINER;
use crate::state::AppState;

/// POST /api/releases
///
/// Creator or admin accounts only. Multipart fields: `title`,
/// `release_date` (YYYY-MM-DD), `estimated_count`, optional `notes`, and
/// file `media`.
pub async fn submit(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    if !account.account_type.can_submit_releases() {
        return Err(AppError::Forbidden(
            "only creator accounts may submit releases".to_string(),
        ));
    }

    let mut form = SubmissionForm::read(multipart).await?;
    let title = form.text("title")?;
    let release_date: NaiveDate = form.parse("release_date")?;
    let estimated_count: i32 = form.parse("estimated_count")?;
    let notes = form.optional_text("notes").unwrap_or_default();
    let media = form.take_file("media")?;

    let media_ref = state
        .uploader()
        .upload(
            RELEASE_CONTAINER,
            account.username.as_str(),
            media.bytes,
            &media.file_name,
        )
        .await?;

    let id = state
        .releases()
        .submit(NewReleaseSubmission {
            username: account.username,
            title,
            release_date,
            estimated_count,
            notes,
            media_ref,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// GET /api/releases/pending
pub async fn pending(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<ReleaseSubmission>>> {
    Ok(Json(state.releases().list().await?))
}

/// POST /api/releases/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReleaseSubmissionId>,
) -> Result<Json<Value>> {
    tracing::info!(target: "audit", reviewer = %admin.username, id = %id, "Release approval requested");
    state.releases().approve(id).await?;
    Ok(Json(json!({ "id": id, "status": "approved" })))
}

/// POST /api/releases/{id}/decline
///
/// Optional body: `{"notify_contact": "..."}`. Defaults to the submitter's
/// account email.
pub async fn decline(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReleaseSubmissionId>,
    body: Bytes,
) -> Result<Json<Value>> {
    let contact = DeclineRequest::from_body(&body)?;
    tracing::info!(target: "audit", reviewer = %admin.username, id = %id, "Release decline requested");
    state.releases().decline(id, contact).await?;
    Ok(Json(json!({ "id": id, "status": "declined" })))
}
