//! Per-tenant ingestion pipeline.
//!
//! # Flow
//!
//! ```text
//! NotStarted ──resolve tenant──▶ Running(customers) ─▶ Running(products) ─▶ Running(orders) ─▶ Completed
//!      │
//!      └──no tenant / inactive / no token──▶ Aborted
//! ```
//!
//! Stages run strictly in order because orders link to customers written by
//! the first stage. A degraded stage never stops the stages after it, and
//! nothing already written is rolled back.
//!
//! Runs for the same tenant queue behind each other; different tenants run
//! in parallel.

mod mapping;
pub mod stages;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;
use xeno_core::{ShopDomain, SyncCounts, SyncStage, TenantId};

use crate::db::{CommerceStore, RepositoryError};
use crate::shopify::{PageLimit, UpstreamSource};

pub use stages::{StageError, StageResult};

use stages::{StageContext, run_stage};

/// Failures that stop a run before any stage executes.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Unknown shop, uninstalled app, or no stored access token.
    #[error("no usable access credential for {0}")]
    AuthenticationMissing(ShopDomain),

    /// The tenant could not be looked up.
    #[error("tenant lookup failed: {0}")]
    Store(#[from] RepositoryError),
}

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running(SyncStage),
    Completed,
    Aborted,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not_started"),
            Self::Running(stage) => write!(f, "running({stage})"),
            Self::Completed => f.write_str("completed"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// Summary of a run that got past tenant resolution.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    /// Always true: degraded stages are reported in `stages`, not here.
    pub success: bool,
    #[serde(rename = "count")]
    pub counts: SyncCounts,
    pub stages: Vec<StageResult>,
}

impl SyncReport {
    /// Stages that did not finish cleanly.
    pub fn degraded(&self) -> impl Iterator<Item = &StageResult> {
        self.stages.iter().filter(|s| !s.is_complete())
    }
}

/// Orchestrates the customer, product and order stages for one tenant.
///
/// Cheap to clone; clones share the same store, upstream and lock table.
#[derive(Clone)]
pub struct SyncPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    store: Arc<dyn CommerceStore>,
    upstream: Arc<dyn UpstreamSource>,
    page_limit: PageLimit,
    tenant_locks: Mutex<HashMap<TenantId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SyncPipeline {
    /// Create a pipeline over the given store and upstream.
    #[must_use]
    pub fn new(
        store: Arc<dyn CommerceStore>,
        upstream: Arc<dyn UpstreamSource>,
        page_limit: PageLimit,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                store,
                upstream,
                page_limit,
                tenant_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Sync customers, products and orders for one storefront.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::AuthenticationMissing` if the shop is unknown,
    /// inactive or has no access token, and `SyncError::Store` if the tenant
    /// lookup itself fails. In both cases no upstream call is made. Stage
    /// failures are never errors; they show up in the report.
    pub async fn run(&self, shop: &ShopDomain) -> Result<SyncReport, SyncError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_run", %run_id, shop = %shop);
        self.execute(run_id, shop).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, shop: &ShopDomain) -> Result<SyncReport, SyncError> {
        let mut state = PipelineState::NotStarted;

        let tenant = match self.inner.store.find_tenant_by_domain(shop).await {
            Ok(tenant) => tenant,
            Err(error) => {
                transition(&mut state, PipelineState::Aborted);
                tracing::error!(error = %error, "Tenant lookup failed");
                return Err(SyncError::Store(error));
            }
        };

        let Some((tenant_id, credential)) =
            tenant.and_then(|t| t.credential().map(|credential| (t.id, credential)))
        else {
            transition(&mut state, PipelineState::Aborted);
            tracing::warn!("No usable credential, sync not started");
            return Err(SyncError::AuthenticationMissing(shop.clone()));
        };

        let lock = self.tenant_lock(tenant_id);
        let guard = lock.lock().await;

        let ctx = StageContext {
            store: self.inner.store.as_ref(),
            upstream: self.inner.upstream.as_ref(),
            tenant: tenant_id,
            credential: &credential,
            limit: self.inner.page_limit,
        };

        let mut counts = SyncCounts::default();
        let mut results = Vec::with_capacity(SyncStage::ALL.len());

        for stage in SyncStage::ALL {
            transition(&mut state, PipelineState::Running(stage));
            let result = match stage {
                SyncStage::Customers => run_stage(stage, stages::sync_customers(&ctx)).await,
                SyncStage::Products => run_stage(stage, stages::sync_products(&ctx)).await,
                SyncStage::Orders => run_stage(stage, stages::sync_orders(&ctx)).await,
            };
            counts.record(stage, result.count);
            results.push(result);
        }

        transition(&mut state, PipelineState::Completed);
        drop(guard);
        self.release_tenant_lock(tenant_id, &lock);

        let report = SyncReport {
            run_id,
            success: true,
            counts,
            stages: results,
        };

        tracing::info!(
            customers = counts.customers,
            products = counts.products,
            orders = counts.orders,
            degraded = report.degraded().count(),
            "Sync finished"
        );

        Ok(report)
    }

    fn tenant_lock(&self, tenant: TenantId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .inner
            .tenant_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(tenant).or_default())
    }

    /// Drop the tenant's lock entry once no other run holds or awaits it.
    fn release_tenant_lock(&self, tenant: TenantId, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .inner
            .tenant_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by the caller
        if Arc::strong_count(lock) == 2 {
            locks.remove(&tenant);
        }
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!(from = %state, to = %next, "Pipeline state");
    *state = next;
}
