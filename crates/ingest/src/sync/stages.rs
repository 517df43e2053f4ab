//! Stage executors and the bulkhead that isolates them.
//!
//! A stage either returns the number of upstream records it synced or a
//! [`Degraded`] carrying the partial count and the reason. [`run_stage`]
//! turns both into a [`StageResult`] so nothing past this module ever sees a
//! stage error as a `Result::Err`.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::Instrument;
use xeno_core::{CustomerId, ShopifyId, SyncStage, TenantId};

use crate::db::{BatchOutcome, CommerceStore, CustomerRecord, ProductRecord, RepositoryError};
use crate::shopify::{
    PageLimit, Resource, ShopCredential, ShopifyCustomer, ShopifyError, ShopifyOrder,
    ShopifyProduct, UpstreamFailure, UpstreamSource,
};

use super::mapping::order_record;

/// Why a stage degraded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The access token was rejected or lacks the scope for this resource.
    #[error("upstream rejected the credential: {0}")]
    UpstreamAuthRejected(String),

    /// Throttling, upstream 5xx, timeout or connection failure.
    #[error("upstream unavailable: {0}")]
    UpstreamTransient(String),

    /// The upstream response broke its contract.
    #[error("malformed upstream response: {0}")]
    UpstreamProtocol(String),

    /// One or more records could not be written.
    #[error("store write failed: {0}")]
    StoreWriteFailure(String),
}

impl StageError {
    /// Stable machine-readable name, used in logs and JSON.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamAuthRejected(_) => "upstream_auth_rejected",
            Self::UpstreamTransient(_) => "upstream_transient",
            Self::UpstreamProtocol(_) => "upstream_protocol",
            Self::StoreWriteFailure(_) => "store_write_failure",
        }
    }
}

impl From<ShopifyError> for StageError {
    fn from(err: ShopifyError) -> Self {
        let detail = err.to_string();
        match err.failure() {
            UpstreamFailure::Auth => Self::UpstreamAuthRejected(detail),
            UpstreamFailure::Transient => Self::UpstreamTransient(detail),
            UpstreamFailure::Protocol => Self::UpstreamProtocol(detail),
        }
    }
}

impl From<RepositoryError> for StageError {
    fn from(err: RepositoryError) -> Self {
        Self::StoreWriteFailure(err.to_string())
    }
}

/// A stage that stopped short, with the number of records it did write.
#[derive(Debug)]
pub struct Degraded {
    pub count: usize,
    pub error: StageError,
}

impl From<StageError> for Degraded {
    fn from(error: StageError) -> Self {
        Self { count: 0, error }
    }
}

impl From<ShopifyError> for Degraded {
    fn from(err: ShopifyError) -> Self {
        StageError::from(err).into()
    }
}

impl From<RepositoryError> for Degraded {
    fn from(err: RepositoryError) -> Self {
        StageError::from(err).into()
    }
}

/// Outcome of one stage within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub stage: SyncStage,
    /// Records synced; zero or partial when degraded.
    pub count: usize,
    /// Set when the stage degraded. Serialized as its kind only.
    #[serde(
        serialize_with = "serialize_error_kind",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<StageError>,
}

impl StageResult {
    /// True when the stage finished without error.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

// Only the kind leaves the process; details stay in the log
#[allow(clippy::ref_option)]
fn serialize_error_kind<S: Serializer>(
    error: &Option<StageError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_str(error.kind()),
        None => serializer.serialize_none(),
    }
}

/// Everything a stage needs, borrowed from the running pipeline.
pub struct StageContext<'a> {
    pub store: &'a dyn CommerceStore,
    pub upstream: &'a dyn UpstreamSource,
    pub tenant: TenantId,
    pub credential: &'a ShopCredential,
    pub limit: PageLimit,
}

impl StageContext<'_> {
    async fn fetch(&self, stage: SyncStage) -> Result<Vec<Value>, ShopifyError> {
        self.upstream
            .fetch_collection(self.credential, Resource::from(stage), self.limit)
            .await
    }
}

/// Run one stage behind a bulkhead.
///
/// The stage's error is logged and folded into the returned result.
pub async fn run_stage<F>(stage: SyncStage, work: F) -> StageResult
where
    F: Future<Output = Result<usize, Degraded>> + Send,
{
    let span = tracing::info_span!("sync_stage", stage = stage.as_str());

    match work.instrument(span.clone()).await {
        Ok(count) => {
            span.in_scope(|| tracing::info!(count, "Stage completed"));
            StageResult {
                stage,
                count,
                error: None,
            }
        }
        Err(Degraded { count, error }) => {
            span.in_scope(|| match &error {
                // Missing scopes and throttling are routine
                StageError::UpstreamAuthRejected(_) | StageError::UpstreamTransient(_) => {
                    tracing::warn!(count, kind = error.kind(), error = %error, "Stage degraded");
                }
                StageError::UpstreamProtocol(_) | StageError::StoreWriteFailure(_) => {
                    tracing::error!(count, kind = error.kind(), error = %error, "Stage degraded");
                }
            });
            StageResult {
                stage,
                count,
                error: Some(error),
            }
        }
    }
}

/// Decode every raw record, failing the whole batch on the first bad one.
fn decode<T: DeserializeOwned>(raw: Vec<Value>) -> Result<Vec<T>, ShopifyError> {
    raw.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(ShopifyError::Parse)
}

/// Turn a batch outcome into a count, degrading on per-record failures.
fn settle(outcome: BatchOutcome, attempted: usize) -> Result<usize, Degraded> {
    if outcome.is_complete() {
        return Ok(outcome.written);
    }

    for failure in &outcome.failures {
        tracing::warn!(
            shopify_id = %failure.shopify_id,
            error = %failure.error,
            "Record not written"
        );
    }

    Err(Degraded {
        count: outcome.written,
        error: StageError::StoreWriteFailure(format!(
            "{} of {attempted} records not written",
            outcome.failures.len()
        )),
    })
}

/// Fetch customers and upsert them as one batch.
///
/// # Errors
///
/// Returns [`Degraded`] if the fetch, decode or batch write fails.
pub async fn sync_customers(ctx: &StageContext<'_>) -> Result<usize, Degraded> {
    let raw = ctx.fetch(SyncStage::Customers).await?;
    let records: Vec<CustomerRecord> = decode::<ShopifyCustomer>(raw)?
        .into_iter()
        .map(CustomerRecord::from)
        .collect();

    let outcome = ctx.store.upsert_customers(ctx.tenant, &records).await?;
    settle(outcome, records.len())
}

/// Fetch products and upsert them as one batch.
///
/// # Errors
///
/// Returns [`Degraded`] if the fetch, decode or batch write fails.
pub async fn sync_products(ctx: &StageContext<'_>) -> Result<usize, Degraded> {
    let raw = ctx.fetch(SyncStage::Products).await?;
    let records: Vec<ProductRecord> = decode::<ShopifyProduct>(raw)?
        .into_iter()
        .map(ProductRecord::from)
        .collect();

    let outcome = ctx.store.upsert_products(ctx.tenant, &records).await?;
    settle(outcome, records.len())
}

/// Fetch orders and upsert them one at a time, linking known customers.
///
/// # Errors
///
/// Returns [`Degraded`] if the fetch or decode fails, or if any order
/// could not be written (with the count of those that were).
pub async fn sync_orders(ctx: &StageContext<'_>) -> Result<usize, Degraded> {
    let raw = ctx.fetch(SyncStage::Orders).await?;
    let orders = decode::<ShopifyOrder>(raw)?;
    let attempted = orders.len();

    let mut written = 0;
    for order in orders {
        let customer_id = match &order.customer {
            Some(customer) => resolve_customer(ctx, &customer.id).await,
            None => None,
        };

        let record = order_record(order, customer_id);
        match ctx.store.upsert_order(ctx.tenant, &record).await {
            Ok(_) => written += 1,
            Err(error) => {
                tracing::warn!(
                    order_id = %record.shopify_id,
                    error = %error,
                    "Order not written"
                );
            }
        }
    }

    if written < attempted {
        return Err(Degraded {
            count: written,
            error: StageError::StoreWriteFailure(format!(
                "{} of {attempted} orders not written",
                attempted - written
            )),
        });
    }

    Ok(written)
}

/// Look up the local customer for an order; a failed lookup counts as absent.
async fn resolve_customer(ctx: &StageContext<'_>, shopify_id: &ShopifyId) -> Option<CustomerId> {
    match ctx.store.find_customer_id(ctx.tenant, shopify_id).await {
        Ok(found) => found,
        Err(error) => {
            tracing::warn!(
                customer_id = %shopify_id,
                error = %error,
                "Customer lookup failed, leaving order unlinked"
            );
            None
        }
    }
}
