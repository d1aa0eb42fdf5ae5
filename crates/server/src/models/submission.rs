//! Pending submissions awaiting review.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use mintgate_core::{Email, KycSubmissionId, ReleaseSubmissionId, Username};

use super::KycProfile;

/// Identity details supplied with a KYC submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KycDetails {
    pub legal_name: String,
    pub address: String,
    pub country: String,
    pub email: Email,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub document_ref: String,
    pub face_image_ref: String,
}

impl From<&KycDetails> for KycProfile {
    fn from(details: &KycDetails) -> Self {
        Self {
            legal_name: Some(details.legal_name.clone()),
            address: Some(details.address.clone()),
            country: Some(details.country.clone()),
            phone: Some(details.phone.clone()),
            date_of_birth: Some(details.date_of_birth),
            document_ref: Some(details.document_ref.clone()),
            face_image_ref: Some(details.face_image_ref.clone()),
        }
    }
}

/// A KYC submission awaiting review.
#[derive(Debug, Clone, Serialize)]
pub struct KycSubmission {
    pub id: KycSubmissionId,
    pub username: Username,
    #[serde(flatten)]
    pub details: KycDetails,
    pub created_at: DateTime<Utc>,
}

/// Input for a KYC submission.
#[derive(Debug, Clone)]
pub struct NewKycSubmission {
    pub username: Username,
    pub details: KycDetails,
}

/// A release awaiting approval for minting.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseSubmission {
    pub id: ReleaseSubmissionId,
    pub username: Username,
    pub title: String,
    pub release_date: NaiveDate,
    pub estimated_count: i32,
    pub notes: String,
    pub media_ref: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a release submission.
#[derive(Debug, Clone)]
pub struct NewReleaseSubmission {
    pub username: Username,
    pub title: String,
    pub release_date: NaiveDate,
    pub estimated_count: i32,
    pub notes: String,
    pub media_ref: String,
}
