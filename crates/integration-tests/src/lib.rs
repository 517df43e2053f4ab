//! Integration tests for Xeno Ingest.
//!
//! # Running Tests
//!
//! ```bash
//! # Point at a scratch database (migrations are applied automatically)
//! export INGEST_TEST_DATABASE_URL=postgres://localhost/xeno_ingest_test
//!
//! # Run integration tests
//! cargo test -p xeno-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `pg_store` - Natural-key upserts against `PostgreSQL`
//! - `pipeline` - Full runs against a mock Shopify server and `PostgreSQL`
//!
//! Every test registers its own shop and uses fresh upstream ids, so tests
//! can share one database and run in any order.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;
use xeno_core::{ShopDomain, ShopifyId};
use xeno_ingest::db::{CommerceStore, PgStore, Tenant};

/// A migrated database plus a tenant owned by the current test.
pub struct TestContext {
    pub pool: PgPool,
    pub store: PgStore,
    pub tenant: Tenant,
}

impl TestContext {
    /// Connect, migrate and register a fresh tenant.
    ///
    /// # Panics
    ///
    /// Panics if no database URL is configured or the database is unreachable.
    pub async fn new() -> Self {
        let url = std::env::var("INGEST_TEST_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("INGEST_TEST_DATABASE_URL or DATABASE_URL must be set");

        let pool = xeno_ingest::db::create_pool(&SecretString::from(url))
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("../ingest/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let store = PgStore::new(pool.clone());
        let tenant = store
            .upsert_tenant(&unique_shop(), &SecretString::from("shpat_integration"))
            .await
            .expect("Failed to register tenant");

        Self {
            pool,
            store,
            tenant,
        }
    }

    /// The store as the pipeline sees it.
    #[must_use]
    pub fn shared_store(&self) -> Arc<dyn CommerceStore> {
        Arc::new(self.store.clone())
    }
}

/// A shop domain no other test uses.
///
/// # Panics
///
/// Never in practice: the generated domain is always valid.
#[must_use]
pub fn unique_shop() -> ShopDomain {
    let label = Uuid::new_v4().simple().to_string();
    ShopDomain::parse(&format!("it-{label}.myshopify.com")).expect("generated domain is valid")
}

/// An upstream id no other test uses.
#[must_use]
pub fn unique_id() -> ShopifyId {
    // Keep it within i64 range like real Shopify ids
    let value = Uuid::new_v4().as_u64_pair().0 >> 1;
    ShopifyId::from(value)
}
