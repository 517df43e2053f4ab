//! HTTP route handlers for the ingest service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Service banner
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (store reachable)
//!
//! # Ingestion
//! GET  /api/ingest/sync?shop=  - Run the sync pipeline for one shop
//! ```

pub mod ingest;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Text served at `/`.
pub const BANNER: &str = "Xeno Shopify Ingestion Service is Running!";

/// Build the complete router, without state applied.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/ingest", ingest::routes())
}

async fn banner() -> &'static str {
    BANNER
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(error) => {
            tracing::warn!(error = %error, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
