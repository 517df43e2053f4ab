//! Order upserts.

use sqlx::postgres::PgExecutor;
use xeno_core::{ShopifyId, TenantId};

use super::{OrderRecord, RepositoryError};

/// Insert or update one order by its global upstream id.
///
/// The update is guarded on `tenant_id`: an order id that already belongs to
/// another tenant is left untouched and reported as a conflict, so a customer
/// link can never cross tenants. A `NULL` customer in `record` keeps any link
/// set by an earlier run.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order belongs to another tenant.
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant: TenantId,
    record: &OrderRecord,
) -> Result<ShopifyId, RepositoryError> {
    let key = sqlx::query_scalar::<_, ShopifyId>(
        r#"
        INSERT INTO ingest."order" AS o (
            shopify_id, tenant_id, total_price, currency, financial_status,
            processed_at, customer_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (shopify_id) DO UPDATE SET
            total_price = EXCLUDED.total_price,
            currency = EXCLUDED.currency,
            financial_status = EXCLUDED.financial_status,
            processed_at = EXCLUDED.processed_at,
            customer_id = COALESCE(EXCLUDED.customer_id, o.customer_id),
            updated_at = NOW()
        WHERE o.tenant_id = EXCLUDED.tenant_id
        RETURNING shopify_id
        "#,
    )
    .bind(record.shopify_id.as_str())
    .bind(tenant)
    .bind(record.total_price)
    .bind(record.currency.as_deref())
    .bind(record.financial_status.as_deref())
    .bind(record.processed_at)
    .bind(record.customer_id)
    .fetch_optional(executor)
    .await?;

    key.ok_or_else(|| {
        RepositoryError::Conflict(format!(
            "order {} belongs to another tenant",
            record.shopify_id
        ))
    })
}
