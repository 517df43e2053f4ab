//! Shopify Admin REST API client (read-only, per tenant).
//!
//! # Architecture
//!
//! - One request per resource collection (`customers`, `products`, `orders`)
//! - Authenticated with the tenant's own access token, never a global one
//! - No retries: a failed fetch degrades the calling stage instead
//! - HTTP and decoding failures are classified into [`UpstreamFailure`]
//!
//! # Example
//!
//! ```rust,ignore
//! use xeno_ingest::shopify::{Resource, RestClient, UpstreamSource};
//!
//! let client = RestClient::new(&config.shopify)?;
//! let raw = client
//!     .fetch_collection(&credential, Resource::Customers, config.shopify.page_limit)
//!     .await?;
//! ```

mod client;
pub mod types;

pub use client::{RestClient, UpstreamSource, parse_collection};
pub use types::*;

use thiserror::Error;

/// Errors that can occur when fetching from the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The access token was rejected (401) or lacks a scope (403).
    #[error("Access rejected ({status}): {message}")]
    AuthRejected {
        /// HTTP status code returned by Shopify.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The credential handed to the client has no token.
    #[error("No access token for {0}")]
    MissingAccessToken(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Shopify returned a 5xx status.
    #[error("Upstream server error ({0})")]
    Server(u16),

    /// Shopify returned a status that is neither success nor a known failure.
    #[error("Unexpected status {0}")]
    UnexpectedStatus(u16),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but did not have the expected shape.
    #[error("Malformed response: {0}")]
    Protocol(String),

    /// The request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Coarse classification of an upstream failure.
///
/// Stages only care which of these happened; the detail stays in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// Credential missing, rejected, or missing a scope.
    Auth,
    /// Throttling, 5xx, timeouts and connection failures.
    Transient,
    /// Anything that means the response was not what the contract promises.
    Protocol,
}

impl ShopifyError {
    /// Classify this error.
    #[must_use]
    pub fn failure(&self) -> UpstreamFailure {
        match self {
            Self::AuthRejected { .. } | Self::MissingAccessToken(_) => UpstreamFailure::Auth,
            Self::RateLimited(_) | Self::Server(_) => UpstreamFailure::Transient,
            Self::Http(e) if e.is_decode() => UpstreamFailure::Protocol,
            Self::Http(_) => UpstreamFailure::Transient,
            Self::UnexpectedStatus(_) | Self::Parse(_) | Self::Protocol(_) | Self::InvalidUrl(_) => {
                UpstreamFailure::Protocol
            }
        }
    }
}
