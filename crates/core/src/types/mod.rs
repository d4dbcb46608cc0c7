//! Core types for the accounts service.
//!
//! This module provides type-safe wrappers for account domain concepts.

pub mod email;
pub mod field;
pub mod id;
pub mod name;
pub mod password;

pub use email::{Email, EmailError};
pub use field::FieldError;
pub use id::{IdParseError, UserId};
pub use name::{DisplayName, NameError};
pub use password::{Password, PasswordError};
