//! Account lifecycle service.
//!
//! Orchestrates validation, duplicate checks, hashing, token issuance and
//! repository calls for register, authenticate, list, fetch, update and
//! delete. Every store call runs under the caller's deadline and at most
//! once; nothing is retried.

mod error;

pub use error::AccountError;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::instrument;

use accounts_core::Password;

use crate::context::RequestContext;
use crate::db::{AccountRepository, RepositoryError};
use crate::models::{AccountView, LoginRequest, NewAccount, RegisterRequest, UpdateAccountRequest};
use crate::services::credentials::{CredentialDigest, CredentialHasher};
use crate::services::tokens::{AccessToken, TokenIssuer};

/// Account lifecycle service.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    token_ttl: Duration,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(
        repo: Arc<dyn AccountRepository>,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
        token_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            hasher,
            tokens,
            token_ttl,
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for a missing or malformed field,
    /// `AccountError::DuplicateEmail` if the email is taken.
    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id))]
    pub async fn register(
        &self,
        ctx: &RequestContext,
        request: RegisterRequest,
    ) -> Result<(), AccountError> {
        let registration = request.validate()?;

        if within(ctx, self.repo.find_by_email(&registration.email))
            .await?
            .is_some()
        {
            return Err(AccountError::DuplicateEmail);
        }

        let credential_digest = self.digest(ctx, registration.password).await?;

        // The store's uniqueness check still applies if a concurrent
        // registration won the race since the lookup above.
        let account = within(
            ctx,
            self.repo.insert(NewAccount {
                name: registration.name,
                email: registration.email,
                credential_digest,
                created_at: Utc::now(),
            }),
        )
        .await?;

        tracing::debug!(user_id = %account.id, "account registered");
        Ok(())
    }

    /// Exchange an email and password for an access token.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidCredentials` when no account matches
    /// both the email and the password.
    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id))]
    pub async fn authenticate(
        &self,
        ctx: &RequestContext,
        request: LoginRequest,
    ) -> Result<AccessToken, AccountError> {
        let credentials = request.validate()?;
        let digest = self.digest(ctx, credentials.password).await?;

        let account = within(
            ctx,
            self.repo
                .find_by_email_and_digest(&credentials.email, &digest),
        )
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

        self.tokens
            .issue(account.id, self.token_ttl)
            .map_err(|e| AccountError::Internal(e.to_string()))
    }

    /// List every account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Store` if the store fails.
    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id))]
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<AccountView>, AccountError> {
        let accounts = within(ctx, self.repo.get_all()).await?;
        Ok(accounts.into_iter().map(AccountView::from).collect())
    }

    /// Fetch one account by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidIdentifier` for a malformed id and
    /// `AccountError::NotFound` if no account has it.
    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, id = %raw_id))]
    pub async fn fetch(&self, ctx: &RequestContext, raw_id: &str) -> Result<AccountView, AccountError> {
        let id = self.repo.parse_id(raw_id)?;

        within(ctx, self.repo.get_by_id(id))
            .await?
            .map(AccountView::from)
            .ok_or(AccountError::NotFound)
    }

    /// Change the name and/or email of an account.
    ///
    /// Absent and empty fields are left untouched; a request with neither
    /// succeeds without touching the store.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` (checked before the id),
    /// `AccountError::InvalidIdentifier`, `AccountError::DuplicateEmail` or
    /// `AccountError::NotFound`.
    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, id = %raw_id))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        raw_id: &str,
        request: UpdateAccountRequest,
    ) -> Result<(), AccountError> {
        let changes = request.validate()?;
        let id = self.repo.parse_id(raw_id)?;

        if changes.is_empty() {
            return Ok(());
        }

        if let Some(email) = &changes.email
            && let Some(owner) = within(ctx, self.repo.find_by_email(email)).await?
            && owner.id != id
        {
            return Err(AccountError::DuplicateEmail);
        }

        within(ctx, self.repo.update_fields(id, &changes)).await
    }

    /// Delete an account. Deleting an absent id succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidIdentifier` for a malformed id and
    /// `AccountError::Store` if the store fails.
    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, id = %raw_id))]
    pub async fn delete(&self, ctx: &RequestContext, raw_id: &str) -> Result<(), AccountError> {
        let id = self.repo.parse_id(raw_id)?;
        let removed = within(ctx, self.repo.delete_by_id(id)).await?;
        if !removed {
            tracing::debug!("delete of absent account");
        }
        Ok(())
    }

    /// Hash off the async executor, bounded by the request deadline.
    async fn digest(
        &self,
        ctx: &RequestContext,
        password: Password,
    ) -> Result<CredentialDigest, AccountError> {
        let hasher = self.hasher.clone();
        let task = tokio::task::spawn_blocking(move || hasher.hash(&password));

        tokio::time::timeout_at(ctx.deadline, task)
            .await
            .map_err(|_| AccountError::DeadlineExceeded)?
            .map_err(|e| AccountError::Internal(e.to_string()))?
            .map_err(|e| AccountError::Internal(e.to_string()))
    }
}

/// Run a store call under the request deadline.
async fn within<T, F>(ctx: &RequestContext, call: F) -> Result<T, AccountError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    tokio::time::timeout_at(ctx.deadline, call)
        .await
        .map_err(|_| AccountError::DeadlineExceeded)?
        .map_err(AccountError::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use secrecy::SecretString;

    use crate::db::MemoryAccountRepository;

    const SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6e";
    const SALT: &str = "Zq8!vN2#kR5@wT1$";

    fn service() -> (AccountService, Arc<MemoryAccountRepository>) {
        let repo = Arc::new(MemoryAccountRepository::new());
        let service = AccountService::new(
            repo.clone(),
            CredentialHasher::new(SecretString::from(SALT)),
            TokenIssuer::new(&SecretString::from(SECRET)),
            Duration::from_secs(24 * 60 * 60),
        );
        (service, repo)
    }

    fn ctx() -> RequestContext {
        RequestContext::new("test", Duration::from_secs(30))
    }

    fn register_req(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_then_fetch() {
        let (svc, repo) = service();
        svc.register(&ctx(), register_req("Tee", "tee@email.com", "123456"))
            .await
            .unwrap();

        let stored = repo
            .find_by_email(&"tee@email.com".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.credential_digest.as_str(), "123456");

        let view = svc.fetch(&ctx(), &stored.id.to_string()).await.unwrap();
        assert_eq!(view.name.as_str(), "Tee");
        assert_eq!(view.email.as_str(), "tee@email.com");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (svc, repo) = service();
        svc.register(&ctx(), register_req("Tee", "tee@email.com", "123456"))
            .await
            .unwrap();

        let err = svc
            .register(&ctx(), register_req("Other", "tee@email.com", "654321"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_validation_stops_at_first_field() {
        let (svc, _) = service();
        let err = svc
            .register(&ctx(), RegisterRequest::default())
            .await
            .unwrap_err();
        match err {
            AccountError::Validation(field) => assert_eq!(field.field, "name"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_issues_token_for_account() {
        let (svc, repo) = service();
        svc.register(&ctx(), register_req("Tee", "tee@email.com", "123456"))
            .await
            .unwrap();

        let token = svc
            .authenticate(&ctx(), login_req("tee@email.com", "123456"))
            .await
            .unwrap();
        assert!(!token.access_token.is_empty());

        let account = repo
            .find_by_email(&"tee@email.com".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        let verified = TokenIssuer::new(&SecretString::from(SECRET))
            .verify(&token.access_token)
            .unwrap();
        assert_eq!(verified.subject, account.id);
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let (svc, _) = service();
        svc.register(&ctx(), register_req("Tee", "tee@email.com", "123456"))
            .await
            .unwrap();

        let wrong_password = svc
            .authenticate(&ctx(), login_req("tee@email.com", "nope"))
            .await
            .unwrap_err();
        let unknown_email = svc
            .authenticate(&ctx(), login_req("nobody@email.com", "123456"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AccountError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (svc, _) = service();
        assert!(svc.list(&ctx()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_invalid_and_missing() {
        let (svc, _) = service();
        assert!(matches!(
            svc.fetch(&ctx(), "507f1f77bcf86cd799439011").await,
            Err(AccountError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            svc.fetch(&ctx(), &accounts_core::UserId::new_v4().to_string())
                .await,
            Err(AccountError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_only_email() {
        let (svc, repo) = service();
        svc.register(&ctx(), register_req("Tee", "tee@email.com", "123456"))
            .await
            .unwrap();
        let id = repo.get_all().await.unwrap()[0].id.to_string();

        svc.update(
            &ctx(),
            &id,
            UpdateAccountRequest {
                name: None,
                email: Some("new@email.com".to_string()),
            },
        )
        .await
        .unwrap();

        let view = svc.fetch(&ctx(), &id).await.unwrap();
        assert_eq!(view.name.as_str(), "Tee");
        assert_eq!(view.email.as_str(), "new@email.com");
    }

    #[tokio::test]
    async fn test_update_empty_is_noop() {
        let (svc, repo) = service();
        svc.register(&ctx(), register_req("Tee", "tee@email.com", "123456"))
            .await
            .unwrap();
        let id = repo.get_all().await.unwrap()[0].id.to_string();

        svc.update(
            &ctx(),
            &id,
            UpdateAccountRequest {
                name: Some(String::new()),
                email: None,
            },
        )
        .await
        .unwrap();

        let view = svc.fetch(&ctx(), &id).await.unwrap();
        assert_eq!(view.name.as_str(), "Tee");
        assert_eq!(view.email.as_str(), "tee@email.com");
    }

    #[tokio::test]
    async fn test_update_email_owned_by_other() {
        let (svc, repo) = service();
        svc.register(&ctx(), register_req("Tee", "tee@email.com", "123456"))
            .await
            .unwrap();
        svc.register(&ctx(), register_req("Bee", "bee@email.com", "123456"))
            .await
            .unwrap();
        let bee = repo
            .find_by_email(&"bee@email.com".parse().unwrap())
            .await
            .unwrap()
            .unwrap();

        let err = svc
            .update(
                &ctx(),
                &bee.id.to_string(),
                UpdateAccountRequest {
                    name: None,
                    email: Some("tee@email.com".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));

        // Re-submitting your own email is fine
        svc.update(
            &ctx(),
            &bee.id.to_string(),
            UpdateAccountRequest {
                name: None,
                email: Some("bee@email.com".to_string()),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_account() {
        let (svc, _) = service();
        let err = svc
            .update(
                &ctx(),
                &accounts_core::UserId::new_v4().to_string(),
                UpdateAccountRequest {
                    name: Some("Tee".to_string()),
                    email: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (svc, repo) = service();
        svc.register(&ctx(), register_req("Tee", "tee@email.com", "123456"))
            .await
            .unwrap();
        let id = repo.get_all().await.unwrap()[0].id.to_string();

        svc.delete(&ctx(), &id).await.unwrap();
        svc.delete(&ctx(), &id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);

        assert!(matches!(
            svc.delete(&ctx(), "not-an-id").await,
            Err(AccountError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_update_validates_body_before_id() {
        let (svc, _) = service();
        let err = svc
            .update(
                &ctx(),
                "not-an-id",
                UpdateAccountRequest {
                    name: None,
                    email: Some("no-at-symbol".to_string()),
                },
            )
            .await
            .unwrap_err();
        match err {
            AccountError::Validation(field) => assert_eq!(field.field, "email"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_same_email() {
        let (svc, repo) = service();
        let mut registrations = tokio::task::JoinSet::new();
        for i in 0..8 {
            let svc = svc.clone();
            registrations.spawn(async move {
                svc.register(
                    &ctx(),
                    register_req(&format!("Tee {i}"), "tee@email.com", "123456"),
                )
                .await
            });
        }

        let mut created = 0;
        let mut duplicates = 0;
        while let Some(result) = registrations.join_next().await {
            match result.unwrap() {
                Ok(()) => created += 1,
                Err(AccountError::DuplicateEmail) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_call_past_deadline() {
        let ctx = RequestContext::new("late", Duration::from_millis(10));
        let result: Result<(), AccountError> =
            within(&ctx, std::future::pending::<Result<(), RepositoryError>>()).await;
        assert!(matches!(result, Err(AccountError::DeadlineExceeded)));
    }
}
