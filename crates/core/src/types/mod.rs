//! Core types for Xeno Ingest.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod shop_domain;
pub mod shopify_id;
pub mod sync;

pub use id::*;
pub use shop_domain::{ShopDomain, ShopDomainError};
pub use shopify_id::{ShopifyId, ShopifyIdError};
pub use sync::{SyncCounts, SyncStage};
