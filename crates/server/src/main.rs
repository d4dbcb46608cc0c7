//! Accounts server.
//!
//! Serves the account API on `APP_HOST:APP_PORT` (default 127.0.0.1:8080)
//! under `APP_PREFIX`, and runs the background user-count logger.
//!
//! # Shutdown
//!
//! Ctrl+C or SIGTERM cancels a single token that stops the background task
//! and drives axum's graceful shutdown.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use accounts_server::config::{AppConfig, LogFormat, StoreBackend};
use accounts_server::db::{self, AccountRepository, MemoryAccountRepository, PgAccountRepository};
use accounts_server::logging::{self, FileGuards};
use accounts_server::tasks::spawn_user_count_logger;
use accounts_server::{AppState, app};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the global subscriber: stdout, optional rolling files, Sentry.
///
/// The returned guards must be held until shutdown so buffered file
/// output is flushed.
fn init_tracing(config: &AppConfig) -> Option<FileGuards> {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "accounts_server=info,tower_http=info".into());

    let json = config.log_format == LogFormat::Json;
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    let (file_layer, guards) = config
        .log_files
        .as_ref()
        .map(|files| logging::file_layer(files).expect("Failed to open log files"))
        .unzip();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    guards
}

async fn open_repository(config: &AppConfig) -> Arc<dyn AccountRepository> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory account store; data is lost on restart");
            Arc::new(MemoryAccountRepository::new())
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_ref()
                .expect("DATABASE_URL is required for the postgres store");
            let pool = db::create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            Arc::new(PgAccountRepository::new(pool))
        }
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    let _log_guards = init_tracing(&config);

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p accounts-cli -- migrate
    let repo = open_repository(&config).await;

    let shutdown = CancellationToken::new();
    let user_count = spawn_user_count_logger(
        Arc::clone(&repo),
        config.user_count_interval,
        shutdown.clone(),
    );

    let addr = config.socket_addr();
    let prefix = config.prefix.clone();
    let app = app(AppState::new(config, repo))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!(%addr, prefix = %prefix, "accounts server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tokio::spawn(shutdown_signal(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .expect("Server error");

    shutdown.cancel();
    if let Err(e) = user_count.await {
        tracing::error!(error = %e, "user count task panicked");
    }
    tracing::info!("Shutdown complete");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM), then cancel `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    token.cancel();
}
