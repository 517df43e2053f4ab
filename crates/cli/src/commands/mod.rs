//! CLI command implementations.

pub mod migrate;
pub mod sync;
pub mod tenant;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;
use xeno_core::ShopDomainError;
use xeno_ingest::config::{self, ConfigError};
use xeno_ingest::db::RepositoryError;
use xeno_ingest::shopify::ShopifyError;
use xeno_ingest::sync::SyncError;

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid shop domain: {0}")]
    InvalidShop(#[from] ShopDomainError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Shopify client error: {0}")]
    Shopify(#[from] ShopifyError),

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Connect to the ingest database named by the environment.
async fn connect() -> Result<PgPool, CommandError> {
    let database_url: SecretString = config::database_url_from_env()?;
    tracing::info!("Connecting to ingest database...");
    Ok(xeno_ingest::db::create_pool(&database_url).await?)
}
