//! One-shot password reset rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mintgate_core::{AccountId, ResetTokenId};

use super::{PgStore, conflict_on_unique};
use crate::models::{NewResetToken, ResetToken};
use crate::store::{ResetTokenStore, StoreError};

#[derive(sqlx::FromRow)]
struct ResetTokenRow {
    id: ResetTokenId,
    account_id: AccountId,
    token_value: String,
    used: bool,
    expires_at: DateTime<Utc>,
}

impl From<ResetTokenRow> for ResetToken {
    fn from(row: ResetTokenRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            token_value: row.token_value,
            used: row.used,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl ResetTokenStore for PgStore {
    async fn insert_reset_token(&self, token: NewResetToken) -> Result<ResetToken, StoreError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ResetTokenRow>(
                r"
                INSERT INTO password_reset_tokens (account_id, token_value, expires_at)
                VALUES ($1, $2, $3)
                RETURNING id, account_id, token_value, used, expires_at
                ",
            )
            .bind(token.account_id)
            .bind(&token.token_value)
            .bind(token.expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on_unique("reset token value"))?;
            Ok::<_, StoreError>(ResetToken::from(row))
        })
        .await
    }

    async fn find_reset_token(
        &self,
        value: &str,
        account: AccountId,
    ) -> Result<Option<ResetToken>, StoreError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ResetTokenRow>(
                r"
                SELECT id, account_id, token_value, used, expires_at
                FROM password_reset_tokens
                WHERE token_value = $1 AND account_id = $2
                ",
            )
            .bind(value)
            .bind(account)
            .fetch_optional(&self.pool)
            .await?;
            Ok::<_, StoreError>(row.map(ResetToken::from))
        })
        .await
    }

    async fn consume_reset_token(
        &self,
        id: ResetTokenId,
        account: AccountId,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            let claimed = sqlx::query(
                r"
                UPDATE password_reset_tokens SET used = TRUE
                WHERE id = $1 AND account_id = $2 AND used = FALSE
                ",
            )
            .bind(id)
            .bind(account)
            .execute(&mut *tx)
            .await?;
            if claimed.rows_affected() != 1 {
                return Ok(false);
            }

            let updated = sqlx::query(
                "UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(account)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() != 1 {
                return Ok(false);
            }

            tx.commit().await?;
            Ok::<_, StoreError>(true)
        })
        .await
    }
}
