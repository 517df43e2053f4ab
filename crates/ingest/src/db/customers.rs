//! Customer upserts and lookups.

use sqlx::postgres::PgExecutor;
use xeno_core::{CustomerId, ShopifyId, TenantId};

use super::{CustomerRecord, RepositoryError};

/// Insert or update one customer by `(shopify_id, tenant_id)`.
///
/// Every synced field is overwritten, so the row always reflects the most
/// recent upstream snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant: TenantId,
    record: &CustomerRecord,
) -> Result<CustomerId, RepositoryError> {
    let id = sqlx::query_scalar::<_, CustomerId>(
        r"
        INSERT INTO ingest.customer (
            shopify_id, tenant_id, email, first_name, last_name, total_spent, orders_count
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (shopify_id, tenant_id) DO UPDATE SET
            email = EXCLUDED.email,
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            total_spent = EXCLUDED.total_spent,
            orders_count = EXCLUDED.orders_count,
            updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(record.shopify_id.as_str())
    .bind(tenant)
    .bind(record.email.as_deref())
    .bind(record.first_name.as_deref())
    .bind(record.last_name.as_deref())
    .bind(record.total_spent)
    .bind(record.orders_count)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Find the local row id for an upstream customer.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_id<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant: TenantId,
    shopify_id: &ShopifyId,
) -> Result<Option<CustomerId>, RepositoryError> {
    let id = sqlx::query_scalar::<_, CustomerId>(
        r"
        SELECT id FROM ingest.customer
        WHERE shopify_id = $1 AND tenant_id = $2
        ",
    )
    .bind(shopify_id.as_str())
    .bind(tenant)
    .fetch_optional(executor)
    .await?;

    Ok(id)
}
