//! One-off sync from the command line.
//!
//! Runs the same pipeline as `GET /api/ingest/sync` and prints the summary
//! as JSON on stdout.

use std::sync::Arc;

use xeno_core::ShopDomain;
use xeno_ingest::config::ShopifyApiConfig;
use xeno_ingest::db::{CommerceStore, PgStore};
use xeno_ingest::shopify::{PageLimit, RestClient, UpstreamSource};
use xeno_ingest::sync::SyncPipeline;

use super::{CommandError, connect};

/// Sync one shop and print the report.
///
/// # Errors
///
/// Returns `CommandError` if configuration is invalid or the run cannot
/// start (unknown shop, missing token, tenant lookup failure).
pub async fn run(shop: &str, limit: Option<u16>) -> Result<(), CommandError> {
    let shop = ShopDomain::parse(shop)?;

    let mut shopify = ShopifyApiConfig::from_env()?;
    if let Some(limit) = limit {
        shopify.page_limit =
            PageLimit::new(limit).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    }

    let pool = connect().await?;
    let pg = PgStore::new(pool);
    let store: Arc<dyn CommerceStore> = Arc::new(pg.clone());
    let upstream: Arc<dyn UpstreamSource> = Arc::new(RestClient::new(&shopify)?);
    let pipeline = SyncPipeline::new(store, upstream, shopify.page_limit);

    let report = pipeline.run(&shop).await?;

    for stage in report.degraded() {
        tracing::warn!(stage = %stage.stage, count = stage.count, "Stage degraded");
    }

    if let Some(tenant) = pg.find_tenant_by_domain(&shop).await? {
        let rows = pg.row_counts(tenant.id).await?;
        tracing::info!(
            customers = rows.customers,
            products = rows.products,
            orders = rows.orders,
            "Rows stored for tenant"
        );
    }

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
