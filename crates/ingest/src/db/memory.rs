//! In-process [`CommerceStore`] for unit tests.
//!
//! Batches are applied record by record and failures are collected rather
//! than rolled back, which is the best-effort half of the store contract.
//! Writes and customer lookups can be made to fail per natural key.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use xeno_core::{CustomerId, ProductId, ShopDomain, ShopifyId, TenantId};

use super::{
    BatchOutcome, CommerceStore, CustomerRecord, OrderRecord, ProductRecord, RecordFailure,
    RepositoryError, RowCounts, Tenant,
};

/// A customer row as held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCustomer {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub record: CustomerRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product row as held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProduct {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub record: ProductRecord,
}

/// An order row as held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOrder {
    pub tenant_id: TenantId,
    pub record: OrderRecord,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i32,
    tenants: HashMap<ShopDomain, Tenant>,
    customers: HashMap<(TenantId, ShopifyId), StoredCustomer>,
    products: HashMap<(TenantId, ShopifyId), StoredProduct>,
    orders: HashMap<ShopifyId, StoredOrder>,
    failing_keys: HashSet<ShopifyId>,
    failing_lookups: HashSet<ShopifyId>,
    writes: usize,
}

impl MemoryState {
    const fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_injected_failure(&self, key: &ShopifyId) -> Result<(), RepositoryError> {
        if self.failing_keys.contains(key) {
            return Err(RepositoryError::Conflict(format!(
                "write rejected for {key}"
            )));
        }
        Ok(())
    }

    fn upsert_customer(
        &mut self,
        tenant: TenantId,
        record: &CustomerRecord,
    ) -> Result<CustomerId, RepositoryError> {
        self.check_injected_failure(&record.shopify_id)?;
        self.writes += 1;

        let now = Utc::now();
        let key = (tenant, record.shopify_id.clone());
        if let Some(existing) = self.customers.get_mut(&key) {
            existing.record = record.clone();
            existing.updated_at = now;
            return Ok(existing.id);
        }

        let id = CustomerId::new(self.allocate_id());
        self.customers.insert(
            key,
            StoredCustomer {
                id,
                tenant_id: tenant,
                record: record.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn upsert_product(
        &mut self,
        tenant: TenantId,
        record: &ProductRecord,
    ) -> Result<ProductId, RepositoryError> {
        self.check_injected_failure(&record.shopify_id)?;
        self.writes += 1;

        let key = (tenant, record.shopify_id.clone());
        if let Some(existing) = self.products.get_mut(&key) {
            existing.record = record.clone();
            return Ok(existing.id);
        }

        let id = ProductId::new(self.allocate_id());
        self.products.insert(
            key,
            StoredProduct {
                id,
                tenant_id: tenant,
                record: record.clone(),
            },
        );
        Ok(id)
    }
}

/// Store that keeps every row in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a tenant directly, bypassing credential checks.
    ///
    /// Lets tests set up inactive tenants or tenants without a token.
    pub fn insert_tenant(
        &self,
        shop: ShopDomain,
        access_token: Option<&str>,
        is_active: bool,
    ) -> Tenant {
        let mut state = self.state();
        let tenant = Tenant {
            id: TenantId::new(state.allocate_id()),
            shop_domain: shop.clone(),
            access_token: access_token.map(SecretString::from),
            is_active,
        };
        state.tenants.insert(shop, tenant.clone());
        tenant
    }

    /// Make every future write of this natural key fail.
    pub fn fail_writes_for(&self, shopify_id: ShopifyId) {
        self.state().failing_keys.insert(shopify_id);
    }

    /// Make every future customer lookup for this natural key fail.
    pub fn fail_lookups_for(&self, shopify_id: ShopifyId) {
        self.state().failing_lookups.insert(shopify_id);
    }

    /// Number of successful row writes so far, across all tables.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Count a tenant's synced rows.
    #[must_use]
    pub fn row_counts(&self, tenant: TenantId) -> RowCounts {
        let state = self.state();
        RowCounts {
            customers: state
                .customers
                .values()
                .filter(|c| c.tenant_id == tenant)
                .count(),
            products: state
                .products
                .values()
                .filter(|p| p.tenant_id == tenant)
                .count(),
            orders: state
                .orders
                .values()
                .filter(|o| o.tenant_id == tenant)
                .count(),
        }
    }

    /// Get a customer row by natural key.
    #[must_use]
    pub fn customer(&self, tenant: TenantId, shopify_id: &ShopifyId) -> Option<StoredCustomer> {
        self.state()
            .customers
            .get(&(tenant, shopify_id.clone()))
            .cloned()
    }

    /// Get a product row by natural key.
    #[must_use]
    pub fn product(&self, tenant: TenantId, shopify_id: &ShopifyId) -> Option<StoredProduct> {
        self.state()
            .products
            .get(&(tenant, shopify_id.clone()))
            .cloned()
    }

    /// Get an order row by its global id.
    #[must_use]
    pub fn order(&self, shopify_id: &ShopifyId) -> Option<StoredOrder> {
        self.state().orders.get(shopify_id).cloned()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn find_tenant_by_domain(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<Tenant>, RepositoryError> {
        Ok(self.state().tenants.get(shop).cloned())
    }

    async fn upsert_tenant(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Tenant, RepositoryError> {
        let mut state = self.state();
        let id = match state.tenants.get(shop) {
            Some(existing) => existing.id,
            None => TenantId::new(state.allocate_id()),
        };
        let tenant = Tenant {
            id,
            shop_domain: shop.clone(),
            access_token: Some(access_token.clone()),
            is_active: true,
        };
        state.tenants.insert(shop.clone(), tenant.clone());
        Ok(tenant)
    }

    async fn upsert_customers(
        &self,
        tenant: TenantId,
        records: &[CustomerRecord],
    ) -> Result<BatchOutcome, RepositoryError> {
        let mut state = self.state();
        let mut outcome = BatchOutcome::default();
        for record in records {
            match state.upsert_customer(tenant, record) {
                Ok(_) => outcome.written += 1,
                Err(error) => outcome.failures.push(RecordFailure {
                    shopify_id: record.shopify_id.clone(),
                    error,
                }),
            }
        }
        Ok(outcome)
    }

    async fn upsert_products(
        &self,
        tenant: TenantId,
        records: &[ProductRecord],
    ) -> Result<BatchOutcome, RepositoryError> {
        let mut state = self.state();
        let mut outcome = BatchOutcome::default();
        for record in records {
            match state.upsert_product(tenant, record) {
                Ok(_) => outcome.written += 1,
                Err(error) => outcome.failures.push(RecordFailure {
                    shopify_id: record.shopify_id.clone(),
                    error,
                }),
            }
        }
        Ok(outcome)
    }

    async fn find_customer_id(
        &self,
        tenant: TenantId,
        shopify_id: &ShopifyId,
    ) -> Result<Option<CustomerId>, RepositoryError> {
        let state = self.state();
        if state.failing_lookups.contains(shopify_id) {
            return Err(RepositoryError::DataCorruption(format!(
                "lookup failed for customer {shopify_id}"
            )));
        }
        Ok(state
            .customers
            .get(&(tenant, shopify_id.clone()))
            .map(|c| c.id))
    }

    async fn upsert_order(
        &self,
        tenant: TenantId,
        record: &OrderRecord,
    ) -> Result<ShopifyId, RepositoryError> {
        let mut state = self.state();
        state.check_injected_failure(&record.shopify_id)?;

        if let Some(existing) = state.orders.get_mut(&record.shopify_id) {
            if existing.tenant_id != tenant {
                return Err(RepositoryError::Conflict(format!(
                    "order {} belongs to another tenant",
                    record.shopify_id
                )));
            }
            let customer_id = record.customer_id.or(existing.record.customer_id);
            existing.record = OrderRecord {
                customer_id,
                ..record.clone()
            };
        } else {
            state.orders.insert(
                record.shopify_id.clone(),
                StoredOrder {
                    tenant_id: tenant,
                    record: record.clone(),
                },
            );
        }

        state.writes += 1;
        Ok(record.shopify_id.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn shop(domain: &str) -> ShopDomain {
        ShopDomain::parse(domain).unwrap()
    }

    fn customer(id: u64, email: &str, spent: i64) -> CustomerRecord {
        CustomerRecord {
            shopify_id: ShopifyId::from(id),
            email: Some(email.to_string()),
            first_name: None,
            last_name: None,
            total_spent: Decimal::new(spent, 2),
            orders_count: 1,
        }
    }

    fn order(id: u64, customer_id: Option<CustomerId>) -> OrderRecord {
        OrderRecord {
            shopify_id: ShopifyId::from(id),
            total_price: Decimal::new(1000, 2),
            currency: Some("USD".to_string()),
            financial_status: Some("paid".to_string()),
            processed_at: None,
            customer_id,
        }
    }

    #[tokio::test]
    async fn test_upsert_same_key_keeps_one_row_with_last_write() {
        let store = MemoryStore::new();
        let tenant = store.insert_tenant(shop("acme.myshopify.com"), Some("t"), true);

        store
            .upsert_customers(tenant.id, &[customer(1, "old@example.com", 100)])
            .await
            .unwrap();
        store
            .upsert_customers(tenant.id, &[customer(1, "new@example.com", 250)])
            .await
            .unwrap();

        assert_eq!(store.row_counts(tenant.id).customers, 1);
        let row = store.customer(tenant.id, &ShopifyId::from(1_u64)).unwrap();
        assert_eq!(row.record.email.as_deref(), Some("new@example.com"));
        assert_eq!(row.record.total_spent, Decimal::new(250, 2));
    }

    #[tokio::test]
    async fn test_natural_key_is_tenant_scoped() {
        let store = MemoryStore::new();
        let a = store.insert_tenant(shop("a.myshopify.com"), Some("t"), true);
        let b = store.insert_tenant(shop("b.myshopify.com"), Some("t"), true);

        store
            .upsert_customers(a.id, &[customer(1, "x@example.com", 0)])
            .await
            .unwrap();
        store
            .upsert_customers(b.id, &[customer(1, "x@example.com", 0)])
            .await
            .unwrap();

        assert_eq!(store.row_counts(a.id).customers, 1);
        assert_eq!(store.row_counts(b.id).customers, 1);
        assert_ne!(
            store.find_customer_id(a.id, &ShopifyId::from(1_u64)).await.unwrap(),
            store.find_customer_id(b.id, &ShopifyId::from(1_u64)).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_batch_is_best_effort() {
        let store = MemoryStore::new();
        let tenant = store.insert_tenant(shop("acme.myshopify.com"), Some("t"), true);
        store.fail_writes_for(ShopifyId::from(2_u64));

        let outcome = store
            .upsert_customers(
                tenant.id,
                &[
                    customer(1, "a@example.com", 0),
                    customer(2, "b@example.com", 0),
                    customer(3, "c@example.com", 0),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcome.written, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].shopify_id, ShopifyId::from(2_u64));
    }

    #[tokio::test]
    async fn test_order_keeps_existing_link_when_lookup_misses() {
        let store = MemoryStore::new();
        let tenant = store.insert_tenant(shop("acme.myshopify.com"), Some("t"), true);
        let linked = CustomerId::new(77);

        store
            .upsert_order(tenant.id, &order(10, Some(linked)))
            .await
            .unwrap();
        store.upsert_order(tenant.id, &order(10, None)).await.unwrap();

        let row = store.order(&ShopifyId::from(10_u64)).unwrap();
        assert_eq!(row.record.customer_id, Some(linked));
    }

    #[tokio::test]
    async fn test_order_owned_by_other_tenant_is_conflict() {
        let store = MemoryStore::new();
        let a = store.insert_tenant(shop("a.myshopify.com"), Some("t"), true);
        let b = store.insert_tenant(shop("b.myshopify.com"), Some("t"), true);

        store.upsert_order(a.id, &order(10, None)).await.unwrap();
        let err = store.upsert_order(b.id, &order(10, None)).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.order(&ShopifyId::from(10_u64)).unwrap().tenant_id, a.id);
    }

    #[tokio::test]
    async fn test_injected_lookup_failure() {
        let store = MemoryStore::new();
        let tenant = store.insert_tenant(shop("acme.myshopify.com"), Some("t"), true);
        store
            .upsert_customers(tenant.id, &[customer(1, "a@example.com", 0)])
            .await
            .unwrap();
        store.fail_lookups_for(ShopifyId::from(1_u64));

        let err = store
            .find_customer_id(tenant.id, &ShopifyId::from(1_u64))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[tokio::test]
    async fn test_upsert_tenant_keeps_id_and_reactivates() {
        let store = MemoryStore::new();
        let original = store.insert_tenant(shop("acme.myshopify.com"), None, false);

        let refreshed = store
            .upsert_tenant(&shop("acme.myshopify.com"), &SecretString::from("shpat_new"))
            .await
            .unwrap();

        assert_eq!(refreshed.id, original.id);
        assert!(refreshed.is_active);
        assert!(refreshed.credential().is_some());
    }
}
