//! Xeno CLI - Database migrations, tenant onboarding and manual syncs.
//!
//! # Usage
//!
//! ```bash
//! # Run ingest database migrations
//! xeno-cli migrate
//!
//! # Store a shop's Admin API access token
//! xeno-cli tenant register --shop acme.myshopify.com --token shpat_...
//!
//! # Run the sync pipeline once and print the summary
//! xeno-cli sync --shop acme.myshopify.com --limit 100
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `tenant register` - Create or refresh a tenant credential
//! - `sync` - Run the customer, product and order stages for one shop

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "xeno-cli")]
#[command(author, version, about = "Xeno Ingest CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage tenants
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
    /// Sync one shop now
    Sync {
        /// Shop domain (e.g., acme.myshopify.com)
        #[arg(short, long)]
        shop: String,

        /// Records fetched per collection, 1-250 (default: `SHOPIFY_PAGE_LIMIT` or 50)
        #[arg(short, long)]
        limit: Option<u16>,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// Create a tenant or replace its access token
    Register {
        /// Shop domain (e.g., acme.myshopify.com)
        #[arg(short, long)]
        shop: String,

        /// Admin API access token
        #[arg(short, long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize tracing
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
        Commands::Tenant { action } => match action {
            TenantAction::Register { shop, token } => {
                commands::tenant::register(&shop, token).await?;
            }
        },
        Commands::Sync { shop, limit } => commands::sync::run(&shop, limit).await?,
    }
    Ok(())
}
