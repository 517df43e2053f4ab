//! Product upserts.

use sqlx::postgres::PgExecutor;
use xeno_core::{ProductId, TenantId};

use super::{ProductRecord, RepositoryError};

/// Insert or update one product by `(shopify_id, tenant_id)`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    tenant: TenantId,
    record: &ProductRecord,
) -> Result<ProductId, RepositoryError> {
    let id = sqlx::query_scalar::<_, ProductId>(
        r"
        INSERT INTO ingest.product (shopify_id, tenant_id, title, price)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (shopify_id, tenant_id) DO UPDATE SET
            title = EXCLUDED.title,
            price = EXCLUDED.price,
            updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(record.shopify_id.as_str())
    .bind(tenant)
    .bind(&record.title)
    .bind(record.price)
    .fetch_one(executor)
    .await?;

    Ok(id)
}
