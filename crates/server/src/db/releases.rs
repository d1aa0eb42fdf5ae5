//! Pending release submissions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use mintgate_core::ReleaseSubmissionId;

use super::{PgStore, parse_username};
use crate::models::{NewReleaseSubmission, ReleaseSubmission};
use crate::store::{ReleaseStore, StoreError};

const RELEASE_COLUMNS: &str =
    "id, username, title, release_date, estimated_count, notes, media_ref, created_at";

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    id: ReleaseSubmissionId,
    username: String,
    title: String,
    release_date: NaiveDate,
    estimated_count: i32,
    notes: String,
    media_ref: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReleaseRow> for ReleaseSubmission {
    type Error = StoreError;

    fn try_from(row: ReleaseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            username: parse_username(&row.username)?,
            title: row.title,
            release_date: row.release_date,
            estimated_count: row.estimated_count,
            notes: row.notes,
            media_ref: row.media_ref,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ReleaseStore for PgStore {
    async fn insert_pending_release(
        &self,
        submission: NewReleaseSubmission,
    ) -> Result<ReleaseSubmission, StoreError> {
        let sql = format!(
            "INSERT INTO pending_releases \
                 (username, title, release_date, estimated_count, notes, media_ref) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {RELEASE_COLUMNS}"
        );
        self.bounded(async {
            let row = sqlx::query_as::<_, ReleaseRow>(&sql)
                .bind(&submission.username)
                .bind(&submission.title)
                .bind(submission.release_date)
                .bind(submission.estimated_count)
                .bind(&submission.notes)
                .bind(&submission.media_ref)
                .fetch_one(&self.pool)
                .await?;
            ReleaseSubmission::try_from(row)
        })
        .await
    }

    async fn list_pending_release(&self) -> Result<Vec<ReleaseSubmission>, StoreError> {
        let sql = format!("SELECT {RELEASE_COLUMNS} FROM pending_releases ORDER BY id");
        self.bounded(async {
            sqlx::query_as::<_, ReleaseRow>(&sql)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(ReleaseSubmission::try_from)
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    async fn get_pending_release(
        &self,
        id: ReleaseSubmissionId,
    ) -> Result<Option<ReleaseSubmission>, StoreError> {
        let sql = format!("SELECT {RELEASE_COLUMNS} FROM pending_releases WHERE id = $1");
        self.bounded(async {
            sqlx::query_as::<_, ReleaseRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .map(ReleaseSubmission::try_from)
                .transpose()
        })
        .await
    }

    async fn delete_pending_release(&self, id: ReleaseSubmissionId) -> Result<bool, StoreError> {
        self.bounded(async {
            let result = sqlx::query("DELETE FROM pending_releases WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(result.rows_affected() > 0)
        })
        .await
    }
}
