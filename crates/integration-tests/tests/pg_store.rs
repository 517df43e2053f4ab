//! Natural-key upserts against `PostgreSQL`.
//!
//! These tests require a running `PostgreSQL` database reachable through
//! `INGEST_TEST_DATABASE_URL` (or `DATABASE_URL`).

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use secrecy::SecretString;
use xeno_core::ShopifyId;
use xeno_ingest::db::{CommerceStore, CustomerRecord, OrderRecord, ProductRecord, RepositoryError};
use xeno_integration_tests::{TestContext, unique_id, unique_shop};

fn customer(shopify_id: &ShopifyId, email: &str, spent: i64) -> CustomerRecord {
    CustomerRecord {
        shopify_id: shopify_id.clone(),
        email: Some(email.to_string()),
        first_name: Some("Ada".to_string()),
        last_name: Some("Lovelace".to_string()),
        total_spent: Decimal::new(spent, 2),
        orders_count: 1,
    }
}

fn order(shopify_id: &ShopifyId, customer_id: Option<xeno_core::CustomerId>) -> OrderRecord {
    OrderRecord {
        shopify_id: shopify_id.clone(),
        total_price: Decimal::new(2_500, 2),
        currency: Some("USD".to_string()),
        financial_status: Some("paid".to_string()),
        processed_at: None,
        customer_id,
    }
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_customer_upsert_is_idempotent_and_last_write_wins() {
    let ctx = TestContext::new().await;
    let id = unique_id();

    ctx.store
        .upsert_customers(ctx.tenant.id, &[customer(&id, "old@example.com", 100)])
        .await
        .unwrap();
    let outcome = ctx
        .store
        .upsert_customers(ctx.tenant.id, &[customer(&id, "new@example.com", 990)])
        .await
        .unwrap();
    assert_eq!(outcome.written, 1);
    assert!(outcome.is_complete());

    let counts = ctx.store.row_counts(ctx.tenant.id).await.unwrap();
    assert_eq!(counts.customers, 1);

    let (email, spent): (Option<String>, Decimal) = sqlx::query_as(
        "SELECT email, total_spent FROM ingest.customer WHERE shopify_id = $1 AND tenant_id = $2",
    )
    .bind(&id)
    .bind(ctx.tenant.id)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(email.as_deref(), Some("new@example.com"));
    assert_eq!(spent, Decimal::new(990, 2));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_same_upstream_id_is_separate_per_tenant() {
    let ctx = TestContext::new().await;
    let other = ctx
        .store
        .upsert_tenant(&unique_shop(), &SecretString::from("shpat_other"))
        .await
        .unwrap();
    let id = unique_id();

    ctx.store
        .upsert_products(
            ctx.tenant.id,
            &[ProductRecord {
                shopify_id: id.clone(),
                title: "Mug".to_string(),
                price: Decimal::new(1_200, 2),
            }],
        )
        .await
        .unwrap();
    ctx.store
        .upsert_products(
            other.id,
            &[ProductRecord {
                shopify_id: id.clone(),
                title: "Mug".to_string(),
                price: Decimal::new(1_500, 2),
            }],
        )
        .await
        .unwrap();

    assert_eq!(ctx.store.row_counts(ctx.tenant.id).await.unwrap().products, 1);
    assert_eq!(ctx.store.row_counts(other.id).await.unwrap().products, 1);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_customer_batch_rolls_back_on_any_failure() {
    let ctx = TestContext::new().await;
    let good = unique_id();
    let bad = unique_id();

    // Exceeds NUMERIC(14, 2)
    let err = ctx
        .store
        .upsert_customers(
            ctx.tenant.id,
            &[
                customer(&good, "good@example.com", 100),
                customer(&bad, "bad@example.com", 10_000_000_000_000_000),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Database(_)));
    assert_eq!(ctx.store.row_counts(ctx.tenant.id).await.unwrap().customers, 0);
    assert!(ctx.store.find_customer_id(ctx.tenant.id, &good).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_customer_lookup_is_tenant_scoped() {
    let ctx = TestContext::new().await;
    let other = ctx
        .store
        .upsert_tenant(&unique_shop(), &SecretString::from("shpat_other"))
        .await
        .unwrap();
    let id = unique_id();

    ctx.store
        .upsert_customers(ctx.tenant.id, &[customer(&id, "a@example.com", 0)])
        .await
        .unwrap();

    assert!(ctx.store.find_customer_id(ctx.tenant.id, &id).await.unwrap().is_some());
    assert!(ctx.store.find_customer_id(other.id, &id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_order_keeps_link_when_later_lookup_misses() {
    let ctx = TestContext::new().await;
    let customer_id = unique_id();
    let order_id = unique_id();

    ctx.store
        .upsert_customers(ctx.tenant.id, &[customer(&customer_id, "a@example.com", 0)])
        .await
        .unwrap();
    let local = ctx
        .store
        .find_customer_id(ctx.tenant.id, &customer_id)
        .await
        .unwrap();

    ctx.store
        .upsert_order(ctx.tenant.id, &order(&order_id, local))
        .await
        .unwrap();
    ctx.store
        .upsert_order(ctx.tenant.id, &order(&order_id, None))
        .await
        .unwrap();

    let linked: Option<i32> =
        sqlx::query_scalar(r#"SELECT customer_id FROM ingest."order" WHERE shopify_id = $1"#)
            .bind(&order_id)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
    assert_eq!(linked, local.map(|id| id.as_i32()));
    assert_eq!(ctx.store.row_counts(ctx.tenant.id).await.unwrap().orders, 1);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_order_owned_by_other_tenant_is_rejected() {
    let ctx = TestContext::new().await;
    let other = ctx
        .store
        .upsert_tenant(&unique_shop(), &SecretString::from("shpat_other"))
        .await
        .unwrap();
    let order_id = unique_id();

    ctx.store
        .upsert_order(ctx.tenant.id, &order(&order_id, None))
        .await
        .unwrap();
    let err = ctx
        .store
        .upsert_order(other.id, &order(&order_id, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Conflict(_)));
    assert_eq!(ctx.store.row_counts(other.id).await.unwrap().orders, 0);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_tenant_registration_refreshes_token() {
    let ctx = TestContext::new().await;

    let refreshed = ctx
        .store
        .upsert_tenant(&ctx.tenant.shop_domain, &SecretString::from("shpat_rotated"))
        .await
        .unwrap();
    assert_eq!(refreshed.id, ctx.tenant.id);

    let found = ctx
        .store
        .find_tenant_by_domain(&ctx.tenant.shop_domain)
        .await
        .unwrap()
        .unwrap();
    assert!(found.credential().is_some());
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL"]
async fn test_ping() {
    let ctx = TestContext::new().await;
    ctx.store.ping().await.unwrap();
}
