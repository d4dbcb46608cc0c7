//! Accounts server library.
//!
//! Registration, login and user management over HTTP. The binary in
//! `main.rs` only wires configuration, logging and the listener around
//! [`app`]; everything else lives here so it can be tested end to end.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod context;
pub mod db;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod tasks;

pub use routes::app;
pub use state::AppState;
