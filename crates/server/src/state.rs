//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::AccountRepository;
use crate::envelope::EnvelopeBuilder;
use crate::services::{AccountService, CredentialHasher, TokenIssuer};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Every collaborator is built
/// once here from the explicit configuration and handed to the components
/// that need it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    repo: Arc<dyn AccountRepository>,
    accounts: AccountService,
    tokens: TokenIssuer,
    envelopes: EnvelopeBuilder,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `repo` - Account storage variant selected at startup
    #[must_use]
    pub fn new(config: AppConfig, repo: Arc<dyn AccountRepository>) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret);
        let hasher = CredentialHasher::new(config.password_salt.clone());
        let accounts =
            AccountService::new(Arc::clone(&repo), hasher, tokens.clone(), config.token_ttl);
        let envelopes = EnvelopeBuilder::new(tracing::info_span!("accounts_api"));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                repo,
                accounts,
                tokens,
                envelopes,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the account repository.
    #[must_use]
    pub fn repo(&self) -> &Arc<dyn AccountRepository> {
        &self.inner.repo
    }

    /// Get a reference to the account lifecycle service.
    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    /// Get a reference to the token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get a reference to the envelope builder.
    #[must_use]
    pub fn envelopes(&self) -> &EnvelopeBuilder {
        &self.inner.envelopes
    }
}
