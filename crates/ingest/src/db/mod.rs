//! Natural-key upsert layer.
//!
//! # Database: `xeno_ingest`
//!
//! ## Tables (schema `ingest`)
//!
//! - `tenant` - One row per onboarded storefront, holds the OAuth access token
//! - `customer` - Unique on `(shopify_id, tenant_id)`
//! - `product` - Unique on `(shopify_id, tenant_id)`
//! - `order` - Keyed by `shopify_id` alone, soft link to `customer`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/ingest/migrations/` and run via:
//! ```bash
//! cargo run -p xeno-cli -- migrate
//! ```
//!
//! # Stores
//!
//! The pipeline only sees [`CommerceStore`]. [`PgStore`] writes batches in a
//! single transaction (all-or-nothing); the unit-test `MemoryStore` applies
//! records one by one and collects failures (best-effort). Callers must handle
//! both.

mod customers;
#[cfg(test)]
mod memory;
mod orders;
mod postgres;
mod products;
mod tenants;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use xeno_core::{CustomerId, ShopDomain, ShopifyId, TenantId};

#[cfg(test)]
pub use memory::{MemoryStore, StoredCustomer, StoredOrder, StoredProduct};
pub use postgres::PgStore;
pub use tenants::Tenant;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., an order id owned by another tenant).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

// =============================================================================
// Write Models
// =============================================================================

/// Customer fields written on every sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub shopify_id: ShopifyId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub total_spent: Decimal,
    pub orders_count: i32,
}

/// Product fields written on every sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub shopify_id: ShopifyId,
    pub title: String,
    pub price: Decimal,
}

/// Order fields written on every sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub shopify_id: ShopifyId,
    pub total_price: Decimal,
    pub currency: Option<String>,
    pub financial_status: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Local customer row, when the upstream customer was already synced.
    pub customer_id: Option<CustomerId>,
}

/// A record that a best-effort batch could not write.
#[derive(Debug)]
pub struct RecordFailure {
    pub shopify_id: ShopifyId,
    pub error: RepositoryError,
}

/// Result of a batch upsert.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Records written.
    pub written: usize,
    /// Records skipped. Always empty for transactional stores.
    pub failures: Vec<RecordFailure>,
}

impl BatchOutcome {
    /// True when every record was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Row totals for one tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub customers: usize,
    pub products: usize,
    pub orders: usize,
}

// =============================================================================
// Store Capability
// =============================================================================

/// Persistence capability injected into the sync pipeline.
///
/// Upserts are idempotent: writing the same natural key twice leaves one row
/// holding the last write. A missing key always means "create".
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Look up a tenant by storefront domain.
    async fn find_tenant_by_domain(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<Tenant>, RepositoryError>;

    /// Create or refresh a tenant's credential and mark it active.
    async fn upsert_tenant(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Tenant, RepositoryError>;

    /// Upsert customers by `(shopify_id, tenant_id)`.
    async fn upsert_customers(
        &self,
        tenant: TenantId,
        records: &[CustomerRecord],
    ) -> Result<BatchOutcome, RepositoryError>;

    /// Upsert products by `(shopify_id, tenant_id)`.
    async fn upsert_products(
        &self,
        tenant: TenantId,
        records: &[ProductRecord],
    ) -> Result<BatchOutcome, RepositoryError>;

    /// Point lookup of a synced customer by natural key.
    async fn find_customer_id(
        &self,
        tenant: TenantId,
        shopify_id: &ShopifyId,
    ) -> Result<Option<CustomerId>, RepositoryError>;

    /// Upsert one order by its global upstream id, returning that id.
    ///
    /// An existing customer link is kept when `record.customer_id` is `None`.
    /// An id already owned by another tenant is a [`RepositoryError::Conflict`].
    async fn upsert_order(
        &self,
        tenant: TenantId,
        record: &OrderRecord,
    ) -> Result<ShopifyId, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
