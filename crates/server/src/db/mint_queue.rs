//! Downstream mint queue.

use async_trait::async_trait;

use super::PgStore;
use crate::models::MintJob;
use crate::store::{MintQueue, StoreError};

#[async_trait]
impl MintQueue for PgStore {
    async fn enqueue(&self, job: MintJob) -> Result<bool, StoreError> {
        self.bounded(async {
            let result = sqlx::query(
                r"
                INSERT INTO queued_mints (source_release, release_name, owner_address)
                VALUES ($1, $2, $3)
                ON CONFLICT (source_release) DO NOTHING
                ",
            )
            .bind(job.source_release)
            .bind(&job.release_name)
            .bind(&job.owner_address)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(result.rows_affected() == 1)
        })
        .await
    }
}
