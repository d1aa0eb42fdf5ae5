//! Mintgate CLI - Database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mintgate-cli migrate
//!
//! # Promote an account to reviewer
//! mintgate-cli account set-type alice admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `account set-type` - Change an account's type (`user`, `creator`, `admin`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mintgate-cli")]
#[command(author, version, about = "Mintgate CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Change an account's type
    SetType {
        /// Account username
        username: String,

        /// New account type (`user`, `creator`, `admin`)
        account_type: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Account { action } => match action {
            AccountAction::SetType {
                username,
                account_type,
            } => {
                commands::account::set_type(&username, &account_type).await?;
            }
        },
    }
    Ok(())
}
