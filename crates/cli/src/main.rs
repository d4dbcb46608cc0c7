//! Accounts CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! accounts-cli migrate
//!
//! # Print a random secret for JWT_SECRET or PASSWORD_SALT
//! accounts-cli secret
//!
//! # Mint a bearer token for an account
//! accounts-cli token --user-id 67e55044-10b1-426f-9247-bb680e5fe0c8
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "accounts-cli")]
#[command(author, version, about = "Accounts service CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print a random URL-safe secret
    Secret {
        /// Number of random bytes
        #[arg(short, long, default_value_t = 48)]
        bytes: usize,
    },
    /// Mint an access token for an account
    Token {
        /// Account id (canonical UUID)
        #[arg(short, long)]
        user_id: String,

        /// Token lifetime in seconds
        #[arg(long, default_value_t = 86_400)]
        ttl_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Secret { bytes } => {
            println!("{}", commands::secret::generate(bytes));
        }
        Commands::Token { user_id, ttl_secs } => {
            let token = commands::token::issue(&user_id, Duration::from_secs(ttl_secs))?;
            println!("{}", token.access_token);
            tracing::info!(expires_at = %token.expires_at, "token issued");
        }
    }
    Ok(())
}
