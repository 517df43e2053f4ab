//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! xeno-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `INGEST_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Ingest migrations: `crates/ingest/migrations/`

use super::{CommandError, connect};

/// Run ingest database migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running ingest migrations...");
    sqlx::migrate!("../ingest/migrations").run(&pool).await?;

    tracing::info!("Ingest migrations complete!");
    Ok(())
}
