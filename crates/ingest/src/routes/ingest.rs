//! Sync trigger route.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use xeno_core::ShopDomain;

use crate::error::AppError;
use crate::state::AppState;
use crate::sync::SyncReport;

/// Create the ingestion routes router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sync", get(sync))
}

/// Query parameters for `/api/ingest/sync`.
#[derive(Debug, Deserialize)]
pub struct SyncParams {
    pub shop: Option<String>,
}

/// Body returned when a run reached its stages.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: &'static str,
    pub metrics: SyncReport,
}

/// Run the ingestion pipeline for one shop.
///
/// Responds 200 whenever the stages ran, even if some degraded.
#[tracing::instrument(skip_all)]
pub async fn sync(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
) -> Result<Json<SyncResponse>, AppError> {
    let raw = params
        .shop
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Shop domain parameter is required.".to_string()))?;

    let shop = ShopDomain::parse(&raw).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let report = state.pipeline().run(&shop).await?;

    Ok(Json(SyncResponse {
        message: "Data ingestion pipeline executed successfully.",
        metrics: report,
    }))
}
