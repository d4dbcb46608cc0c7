//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string (only when `ACCOUNT_STORE=postgres`)
//! - `JWT_SECRET` - Access token signing secret (min 32 chars, high entropy)
//! - `PASSWORD_SALT` - Process-wide salt for credential digests (min 16 chars, high entropy)
//!
//! ## Optional
//! - `APP_HOST` - Bind address (default: 127.0.0.1)
//! - `APP_PORT` - Listen port (default: 8080)
//! - `APP_PREFIX` - Route prefix (default: /develop)
//! - `APP_TIMEOUT_SECS` - Per-request deadline in seconds (default: 60)
//! - `TOKEN_TTL_SECS` - Access token lifetime in seconds (default: 86400)
//! - `USER_COUNT_INTERVAL_SECS` - User count log interval (default: 10)
//! - `ACCOUNT_STORE` - `postgres` or `memory` (default: postgres)
//! - `LOG_FORMAT` - `text` or `json` (default: text)
//! - `LOG_PATH` - Directory for rolling `info`/`error` JSON log files (unset: stdout only)
//! - `LOG_ROTATION` - `hourly`, `daily` or `never` (default: daily)
//! - `LOG_MAX_FILES` - Rotated files kept per level (default: 7)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_PASSWORD_SALT_LENGTH: usize = 16;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Upper bound for every `*_SECS` setting (one year).
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which account store backs the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// `PostgreSQL` via sqlx.
    Postgres,
    /// Process-local map; data is lost on restart.
    Memory,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One flattened JSON object per event.
    Json,
}

/// How often log files roll over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

/// Rolling log file settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFiles {
    /// Directory the `info` and `error` files are written to
    pub dir: PathBuf,
    /// Rollover schedule
    pub rotation: LogRotation,
    /// Rotated files kept per level; older ones are deleted
    pub max_files: usize,
}

/// Server configuration.
///
/// Built once at startup and handed to every component that needs it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Path prefix every route is nested under (empty for none)
    pub prefix: String,
    /// Deadline applied to each request's store calls
    pub request_timeout: Duration,
    /// Account store selection
    pub store: StoreBackend,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Access token signing secret
    pub jwt_secret: SecretString,
    /// Salt for credential digests
    pub password_salt: SecretString,
    /// Lifetime of issued access tokens
    pub token_ttl: Duration,
    /// How often the background task logs the user count
    pub user_count_interval: Duration,
    /// Log output format
    pub log_format: LogFormat,
    /// Rolling log files, when `LOG_PATH` is set
    pub log_files: Option<LogFiles>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_source(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let source = Source(env);

        let host = source
            .get_or_default("APP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("APP_HOST".to_string(), e.to_string()))?;
        let port = source
            .get_or_default("APP_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("APP_PORT".to_string(), e.to_string()))?;
        let prefix = normalize_prefix(&source.get_or_default("APP_PREFIX", "/develop"));
        let request_timeout = source.get_secs("APP_TIMEOUT_SECS", 60)?;
        let token_ttl = source.get_secs("TOKEN_TTL_SECS", 24 * 60 * 60)?;
        let user_count_interval = source.get_secs("USER_COUNT_INTERVAL_SECS", 10)?;

        let store = match source.get_or_default("ACCOUNT_STORE", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "ACCOUNT_STORE".to_string(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };
        let database_url = match store {
            StoreBackend::Postgres => Some(SecretString::from(source.required("DATABASE_URL")?)),
            StoreBackend::Memory => source.optional("DATABASE_URL").map(SecretString::from),
        };

        let jwt_secret = source.validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET", MIN_JWT_SECRET_LENGTH)?;
        let password_salt = source.validated_secret("PASSWORD_SALT")?;
        validate_secret_length(&password_salt, "PASSWORD_SALT", MIN_PASSWORD_SALT_LENGTH)?;

        let log_format = match source.get_or_default("LOG_FORMAT", "text").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let log_files = source.log_files()?;
        let sentry_dsn = source.optional("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            prefix,
            request_timeout,
            store,
            database_url,
            jwt_secret,
            password_salt,
            token_ttl,
            user_count_interval,
            log_format,
            log_files,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Source<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Source<'_> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a number of seconds in `1..=MAX_DURATION_SECS` as a `Duration`.
    fn get_secs(&self, key: &str, default: u64) -> Result<Duration, ConfigError> {
        let secs = match (self.0)(key) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?,
            None => default,
        };
        if secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if secs > MAX_DURATION_SECS {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must be at most {MAX_DURATION_SECS} seconds"),
            ));
        }
        Ok(Duration::from_secs(secs))
    }

    /// Rolling log file settings; `None` unless `LOG_PATH` is set.
    fn log_files(&self) -> Result<Option<LogFiles>, ConfigError> {
        let Some(dir) = self.optional("LOG_PATH") else {
            return Ok(None);
        };

        let rotation = match self.get_or_default("LOG_ROTATION", "daily").as_str() {
            "hourly" => LogRotation::Hourly,
            "daily" => LogRotation::Daily,
            "never" => LogRotation::Never,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_ROTATION".to_string(),
                    format!("expected 'hourly', 'daily' or 'never', got '{other}'"),
                ));
            }
        };
        let max_files = self
            .get_or_default("LOG_MAX_FILES", "7")
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "LOG_MAX_FILES".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Some(LogFiles {
            dir: PathBuf::from(dir),
            rotation,
            max_files,
        }))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Normalize a route prefix to `/segment` form, or empty for no prefix.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(
    secret: &SecretString,
    var_name: &str,
    min: usize,
) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < min {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {min} characters (got {})", value.len()),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
