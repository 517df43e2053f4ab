//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::CommerceStore;
use crate::sync::SyncPipeline;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds capabilities, not concrete clients, so
/// tests can build it over a `MemoryStore`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn CommerceStore>,
    pipeline: SyncPipeline,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Store used for readiness checks (the pipeline holds its own handle)
    /// * `pipeline` - Sync orchestrator invoked by the trigger route
    #[must_use]
    pub fn new(store: Arc<dyn CommerceStore>, pipeline: SyncPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store, pipeline }),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn CommerceStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the sync pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &SyncPipeline {
        &self.inner.pipeline
    }
}
