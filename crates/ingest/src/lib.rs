//! Xeno Ingest library.
//!
//! Pulls customers, products and orders from each onboarded Shopify store
//! into `PostgreSQL`, one tenant at a time, on demand.
//!
//! The binary in `main.rs` wires [`db::PgStore`] and [`shopify::RestClient`]
//! into a [`sync::SyncPipeline`] and serves the trigger route; `xeno-cli`
//! reuses the same pieces from the command line.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod sync;
