//! `PostgreSQL` account repository.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database. Email uniqueness is a unique index on
//! `accounts.account(email)`; violations surface as
//! [`RepositoryError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use accounts_core::{DisplayName, Email, UserId};

use super::{AccountRepository, RepositoryError};
use crate::models::{Account, AccountChanges, NewAccount};
use crate::services::credentials::CredentialDigest;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` account queries.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: UserId,
    name: String,
    email: String,
    credential_digest: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let name = DisplayName::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid name in database: {e}"))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name,
            email,
            credential_digest: CredentialDigest::from_stored(row.credential_digest),
            created_at: row.created_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, name, email, credential_digest, created_at";

fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("email already exists".to_owned());
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Repository
// =============================================================================

/// Account repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new repository over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn insert(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let row: AccountRow = sqlx::query_as(&format!(
            r"
            INSERT INTO accounts.account (name, email, credential_digest, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "
        ))
        .bind(account.name.as_str())
        .bind(account.email.as_str())
        .bind(account.credential_digest.as_str())
        .bind(account.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        debug!(id = %row.id, "Inserted account");
        row.try_into()
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts.account WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, digest), fields(email = %email))]
    async fn find_by_email_and_digest(
        &self,
        email: &Email,
        digest: &CredentialDigest,
    ) -> Result<Option<Account>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            r"
            SELECT {ACCOUNT_COLUMNS} FROM accounts.account
            WHERE email = $1 AND credential_digest = $2
            "
        ))
        .bind(email.as_str())
        .bind(digest.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_by_id(&self, id: UserId) -> Result<Option<Account>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts.account WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn get_all(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts.account ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self, changes), fields(id = %id))]
    async fn update_fields(
        &self,
        id: UserId,
        changes: &AccountChanges,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE accounts.account
            SET name = COALESCE($2, name),
                email = COALESCE($3, email)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(changes.name.as_ref().map(DisplayName::as_str))
        .bind(changes.email.as_ref().map(Email::as_str))
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_by_id(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM accounts.account WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts.account")
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative row count: {count}")))
    }
}
