//! Account and creator-application queries.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use mintgate_core::{AccountId, AccountType, CreatorApplicationId, Email, Username};

use super::{PgStore, conflict_on_unique, parse_email, parse_username};
use crate::models::{
    Account, AccountUpdate, CreatorApplication, KycProfile, NewAccount, NewCreatorApplication,
};
use crate::store::{AccountStore, StoreError};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, email_verified, account_type, \
     wallet_id, kyc_verified, legal_name, address, country, phone, date_of_birth, \
     document_ref, face_image_ref, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    username: String,
    email: String,
    password_hash: String,
    email_verified: bool,
    account_type: AccountType,
    wallet_id: Option<String>,
    kyc_verified: bool,
    legal_name: Option<String>,
    address: Option<String>,
    country: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    document_ref: Option<String>,
    face_image_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            username: parse_username(&row.username)?,
            email: parse_email(&row.email)?,
            password_hash: row.password_hash,
            email_verified: row.email_verified,
            account_type: row.account_type,
            wallet_id: row.wallet_id,
            kyc_verified: row.kyc_verified,
            kyc: KycProfile {
                legal_name: row.legal_name,
                address: row.address,
                country: row.country,
                phone: row.phone,
                date_of_birth: row.date_of_birth,
                document_ref: row.document_ref,
                face_image_ref: row.face_image_ref,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CreatorApplicationRow {
    id: CreatorApplicationId,
    username: String,
    creator_name: String,
    website: String,
    social_links: Vec<String>,
    reason: String,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_username(&self, username: &Username) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        self.bounded(async {
            sqlx::query_as::<_, AccountRow>(&sql)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?
                .map(Account::try_from)
                .transpose()
        })
        .await
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        self.bounded(async {
            sqlx::query_as::<_, AccountRow>(&sql)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?
                .map(Account::try_from)
                .transpose()
        })
        .await
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO accounts (username, email, password_hash, account_type) \
             VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        self.bounded(async {
            let row = sqlx::query_as::<_, AccountRow>(&sql)
                .bind(&account.username)
                .bind(&account.email)
                .bind(&account.password_hash)
                .bind(account.account_type)
                .fetch_one(&self.pool)
                .await
                .map_err(conflict_on_unique("username or email"))?;
            Account::try_from(row)
        })
        .await
    }

    async fn update_account(
        &self,
        username: &Username,
        update: AccountUpdate,
    ) -> Result<Account, StoreError> {
        let sql = format!(
            "UPDATE accounts SET \
                 username = COALESCE($2, username), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 wallet_id = COALESCE($5, wallet_id), \
                 account_type = COALESCE($6, account_type), \
                 updated_at = NOW() \
             WHERE username = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        self.bounded(async {
            let row = sqlx::query_as::<_, AccountRow>(&sql)
                .bind(username)
                .bind(update.username.as_ref())
                .bind(update.email.as_ref())
                .bind(update.password_hash.as_deref())
                .bind(update.wallet_id.as_deref())
                .bind(update.account_type)
                .fetch_optional(&self.pool)
                .await
                .map_err(conflict_on_unique("username or email"))?
                .ok_or(StoreError::NotFound)?;
            Account::try_from(row)
        })
        .await
    }

    async fn set_email_verified(&self, username: &Username) -> Result<bool, StoreError> {
        self.bounded(async {
            let result = sqlx::query(
                "UPDATE accounts SET email_verified = TRUE, updated_at = NOW() WHERE username = $1",
            )
            .bind(username)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(result.rows_affected() > 0)
        })
        .await
    }

    async fn apply_kyc(
        &self,
        username: &Username,
        profile: &KycProfile,
    ) -> Result<bool, StoreError> {
        self.bounded(async {
            let result = sqlx::query(
                r"
                UPDATE accounts SET
                    legal_name = $2, address = $3, country = $4, phone = $5,
                    date_of_birth = $6, document_ref = $7, face_image_ref = $8,
                    kyc_verified = TRUE, updated_at = NOW()
                WHERE username = $1
                ",
            )
            .bind(username)
            .bind(profile.legal_name.as_deref())
            .bind(profile.address.as_deref())
            .bind(profile.country.as_deref())
            .bind(profile.phone.as_deref())
            .bind(profile.date_of_birth)
            .bind(profile.document_ref.as_deref())
            .bind(profile.face_image_ref.as_deref())
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(result.rows_affected() > 0)
        })
        .await
    }

    async fn insert_creator_application(
        &self,
        application: NewCreatorApplication,
    ) -> Result<CreatorApplication, StoreError> {
        self.bounded(async {
            let row = sqlx::query_as::<_, CreatorApplicationRow>(
                r"
                INSERT INTO creator_applications
                    (username, creator_name, website, social_links, reason)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, username, creator_name, website, social_links, reason, created_at
                ",
            )
            .bind(&application.username)
            .bind(&application.creator_name)
            .bind(&application.website)
            .bind(&application.social_links)
            .bind(&application.reason)
            .fetch_one(&self.pool)
            .await?;

            Ok::<_, StoreError>(CreatorApplication {
                id: row.id,
                username: parse_username(&row.username)?,
                creator_name: row.creator_name,
                website: row.website,
                social_links: row.social_links,
                reason: row.reason,
                created_at: row.created_at,
            })
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
