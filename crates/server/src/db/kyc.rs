//! Pending KYC submissions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use mintgate_core::KycSubmissionId;

use super::{PgStore, parse_email, parse_username};
use crate::models::{KycDetails, KycSubmission, NewKycSubmission};
use crate::store::{KycStore, StoreError};

const KYC_COLUMNS: &str = "id, username, legal_name, address, country, email, phone, \
     date_of_birth, document_ref, face_image_ref, created_at";

#[derive(sqlx::FromRow)]
struct KycRow {
    id: KycSubmissionId,
    username: String,
    legal_name: String,
    address: String,
    country: String,
    email: String,
    phone: String,
    date_of_birth: NaiveDate,
    document_ref: String,
    face_image_ref: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<KycRow> for KycSubmission {
    type Error = StoreError;

    fn try_from(row: KycRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            username: parse_username(&row.username)?,
            details: KycDetails {
                legal_name: row.legal_name,
                address: row.address,
                country: row.country,
                email: parse_email(&row.email)?,
                phone: row.phone,
                date_of_birth: row.date_of_birth,
                document_ref: row.document_ref,
                face_image_ref: row.face_image_ref,
            },
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl KycStore for PgStore {
    async fn insert_pending_kyc(
        &self,
        submission: NewKycSubmission,
    ) -> Result<KycSubmission, StoreError> {
        let sql = format!(
            "INSERT INTO pending_kyc (username, legal_name, address, country, email, phone, \
                 date_of_birth, document_ref, face_image_ref) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {KYC_COLUMNS}"
        );
        let details = &submission.details;
        self.bounded(async {
            let row = sqlx::query_as::<_, KycRow>(&sql)
                .bind(&submission.username)
                .bind(&details.legal_name)
                .bind(&details.address)
                .bind(&details.country)
                .bind(&details.email)
                .bind(&details.phone)
                .bind(details.date_of_birth)
                .bind(&details.document_ref)
                .bind(&details.face_image_ref)
                .fetch_one(&self.pool)
                .await?;
            KycSubmission::try_from(row)
        })
        .await
    }

    async fn list_pending_kyc(&self) -> Result<Vec<KycSubmission>, StoreError> {
        let sql = format!("SELECT {KYC_COLUMNS} FROM pending_kyc ORDER BY id");
        self.bounded(async {
            sqlx::query_as::<_, KycRow>(&sql)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(KycSubmission::try_from)
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    async fn get_pending_kyc(
        &self,
        id: KycSubmissionId,
    ) -> Result<Option<KycSubmission>, StoreError> {
        let sql = format!("SELECT {KYC_COLUMNS} FROM pending_kyc WHERE id = $1");
        self.bounded(async {
            sqlx::query_as::<_, KycRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .map(KycSubmission::try_from)
                .transpose()
        })
        .await
    }

    async fn delete_pending_kyc(&self, id: KycSubmissionId) -> Result<bool, StoreError> {
        self.bounded(async {
            let result = sqlx::query("DELETE FROM pending_kyc WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(result.rows_affected() > 0)
        })
        .await
    }
}
