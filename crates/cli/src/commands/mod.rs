//! CLI subcommand implementations.

pub mod migrate;
pub mod secret;
pub mod token;
