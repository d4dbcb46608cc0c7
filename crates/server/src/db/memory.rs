//! In-process account repository.
//!
//! Backs tests and local demos (`ACCOUNT_STORE=memory`). All mutations take
//! the write lock, so the email uniqueness check and the write that follows
//! it are atomic with respect to each other.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use accounts_core::{Email, UserId};

use super::{AccountRepository, RepositoryError};
use crate::models::{Account, AccountChanges, NewAccount};
use crate::services::credentials::CredentialDigest;

/// Account repository held in memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryAccountRepository {
    accounts: RwLock<BTreeMap<UserId, Account>>,
}

impl MemoryAccountRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(accounts: &BTreeMap<UserId, Account>, email: &Email, except: Option<UserId>) -> bool {
    accounts
        .values()
        .any(|a| &a.email == email && Some(a.id) != except)
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn insert(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.write().await;

        if email_taken(&accounts, &account.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let stored = Account {
            id: UserId::new_v4(),
            name: account.name,
            email: account.email,
            credential_digest: account.credential_digest,
            created_at: account.created_at,
        };
        accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn find_by_email_and_digest(
        &self,
        email: &Email,
        digest: &CredentialDigest,
    ) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| &a.email == email && &a.credential_digest == digest)
            .cloned())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Account>, RepositoryError> {
        let mut all: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn update_fields(
        &self,
        id: UserId,
        changes: &AccountChanges,
    ) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.write().await;

        if let Some(email) = &changes.email
            && email_taken(&accounts, email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let account = accounts.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = &changes.name {
            account.name = name.clone();
        }
        if let Some(email) = &changes.email {
            account.email = email.clone();
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.accounts.read().await.len() as u64)
    }
}
