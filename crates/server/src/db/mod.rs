//! Account storage.
//!
//! The lifecycle service talks to storage only through the
//! [`AccountRepository`] capability. Two variants exist:
//!
//! - [`PgAccountRepository`] - `PostgreSQL` via sqlx (production)
//! - [`MemoryAccountRepository`] - process-local map (tests, local demos)
//!
//! # Tables
//!
//! - `accounts.account` - One row per account; `email` carries a unique index
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p accounts-cli -- migrate
//! ```

pub mod accounts;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use accounts_core::{Email, UserId};

pub use accounts::PgAccountRepository;
pub use memory::MemoryAccountRepository;

use crate::models::{Account, AccountChanges, NewAccount};
use crate::services::credentials::CredentialDigest;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The identifier is not in the store's identifier format.
    #[error("invalid identifier format: {0}")]
    InvalidIdentifier(String),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage capability for accounts.
///
/// Lookups return `Ok(None)` for a missing record so callers can tell
/// "not found" apart from a store failure. Email uniqueness is enforced by
/// the store itself: `insert` and `update_fields` return
/// [`RepositoryError::Conflict`] when another account already owns the email.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Parse a raw identifier into the store's identifier format.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidIdentifier`] for malformed input.
    fn parse_id(&self, raw: &str) -> Result<UserId, RepositoryError> {
        UserId::parse(raw).map_err(|e| RepositoryError::InvalidIdentifier(e.0))
    }

    /// Persist a new account and return it with its store-assigned id.
    async fn insert(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    /// Find the account that owns `email`.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError>;

    /// Find the account whose email and credential digest both match.
    async fn find_by_email_and_digest(
        &self,
        email: &Email,
        digest: &CredentialDigest,
    ) -> Result<Option<Account>, RepositoryError>;

    /// Get an account by id.
    async fn get_by_id(&self, id: UserId) -> Result<Option<Account>, RepositoryError>;

    /// List every account, oldest first.
    async fn get_all(&self) -> Result<Vec<Account>, RepositoryError>;

    /// Apply the present fields of `changes` to an account.
    ///
    /// Returns [`RepositoryError::NotFound`] if no account has this id.
    async fn update_fields(
        &self,
        id: UserId,
        changes: &AccountChanges,
    ) -> Result<(), RepositoryError>;

    /// Delete an account. Returns whether a record was removed.
    async fn delete_by_id(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// Count stored accounts.
    async fn count(&self) -> Result<u64, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(30))
        .connect(database_url.expose_secret())
        .await
}
