//! Accounts Core - Shared domain types.
//!
//! This crate provides the validated types used across the accounts
//! components:
//! - `server` - HTTP API, lifecycle service, and storage
//! - `cli` - Command-line tools for migrations and secrets
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Parsing a value into one of these types is the validation
//! step, so a constructed `Email` or `UserId` is always well-formed.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for identifiers, emails, names, and passwords

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
