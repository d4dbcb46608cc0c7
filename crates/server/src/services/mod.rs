//! Business logic services.
//!
//! - `accounts` - Account lifecycle (register, login, list, fetch, update, delete)
//! - `credentials` - Deterministic keyed password hashing
//! - `tokens` - JWT access token issuing and verification

pub mod accounts;
pub mod credentials;
pub mod tokens;

pub use accounts::{AccountError, AccountService};
pub use credentials::{CredentialDigest, CredentialHasher};
pub use tokens::{AccessToken, TokenIssuer};
