//! `PostgreSQL`-backed [`CommerceStore`].

use async_trait::async_trait;
use secrecy::SecretString;
use sqlx::PgPool;
use tracing::instrument;
use xeno_core::{CustomerId, ShopDomain, ShopifyId, TenantId};

use super::tenants::TenantRepository;
use super::{
    BatchOutcome, CommerceStore, CustomerRecord, OrderRecord, ProductRecord, RepositoryError,
    RowCounts, Tenant, customers, orders, products,
};

/// Store backed by a `PostgreSQL` pool.
///
/// Batch upserts run inside one transaction: either every record in the
/// batch is written or none is.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count a tenant's synced rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn row_counts(&self, tenant: TenantId) -> Result<RowCounts, RepositoryError> {
        let (customers, products, orders) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM ingest.customer WHERE tenant_id = $1),
                (SELECT COUNT(*) FROM ingest.product WHERE tenant_id = $1),
                (SELECT COUNT(*) FROM ingest."order" WHERE tenant_id = $1)
            "#,
        )
        .bind(tenant)
        .fetch_one(&self.pool)
        .await?;

        let to_usize = |n: i64| {
            usize::try_from(n)
                .map_err(|_| RepositoryError::DataCorruption(format!("negative row count {n}")))
        };

        Ok(RowCounts {
            customers: to_usize(customers)?,
            products: to_usize(products)?,
            orders: to_usize(orders)?,
        })
    }
}

#[async_trait]
impl CommerceStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_tenant_by_domain(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<Tenant>, RepositoryError> {
        TenantRepository::new(&self.pool).get_by_domain(shop).await
    }

    async fn upsert_tenant(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Tenant, RepositoryError> {
        TenantRepository::new(&self.pool)
            .save(shop, access_token)
            .await
    }

    #[instrument(skip_all, fields(tenant_id = %tenant, records = records.len()))]
    async fn upsert_customers(
        &self,
        tenant: TenantId,
        records: &[CustomerRecord],
    ) -> Result<BatchOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            customers::upsert(&mut *tx, tenant, record).await?;
        }
        tx.commit().await?;

        Ok(BatchOutcome {
            written: records.len(),
            failures: Vec::new(),
        })
    }

    #[instrument(skip_all, fields(tenant_id = %tenant, records = records.len()))]
    async fn upsert_products(
        &self,
        tenant: TenantId,
        records: &[ProductRecord],
    ) -> Result<BatchOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            products::upsert(&mut *tx, tenant, record).await?;
        }
        tx.commit().await?;

        Ok(BatchOutcome {
            written: records.len(),
            failures: Vec::new(),
        })
    }

    async fn find_customer_id(
        &self,
        tenant: TenantId,
        shopify_id: &ShopifyId,
    ) -> Result<Option<CustomerId>, RepositoryError> {
        customers::find_id(&self.pool, tenant, shopify_id).await
    }

    async fn upsert_order(
        &self,
        tenant: TenantId,
        record: &OrderRecord,
    ) -> Result<ShopifyId, RepositoryError> {
        orders::upsert(&self.pool, tenant, record).await
    }
}
