//! Account domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use accounts_core::{DisplayName, Email, UserId};

use crate::services::credentials::CredentialDigest;

/// A stored account (domain type).
///
/// Deliberately not `Serialize`: the credential digest must never reach a
/// response body. Use [`AccountView`] for output.
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account ID, assigned by the store.
    pub id: UserId,
    /// Display name.
    pub name: DisplayName,
    /// Email address, unique across accounts.
    pub email: Email,
    /// One-way digest of the account's password.
    pub credential_digest: CredentialDigest,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// An account about to be inserted; the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: DisplayName,
    pub email: Email,
    pub credential_digest: CredentialDigest,
    pub created_at: DateTime<Utc>,
}

/// Fields to change on an existing account. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub name: Option<DisplayName>,
    pub email: Option<Email>,
}

impl AccountChanges {
    /// Whether there is nothing to apply.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// The public shape of an account in API responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: UserId,
    pub name: DisplayName,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            created_at: account.created_at,
        }
    }
}
