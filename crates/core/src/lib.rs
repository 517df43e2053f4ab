//! Xeno Ingest Core - Shared types library.
//!
//! This crate provides common types used across all Xeno Ingest components:
//! - `ingest` - Sync pipeline, store adapters and the HTTP trigger service
//! - `cli` - Command-line tools for migrations, tenant registration and manual syncs
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, shop domains, upstream IDs and sync counts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
