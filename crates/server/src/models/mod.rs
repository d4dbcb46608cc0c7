//! Domain models for the accounts server.
//!
//! - [`account`] - Stored account records and their public view
//! - [`requests`] - Request bodies and their validation into domain inputs

pub mod account;
pub mod requests;

pub use account::{Account, AccountChanges, AccountView, NewAccount};
pub use requests::{
    Credentials, LoginRequest, RegisterRequest, Registration, UpdateAccountRequest,
};
