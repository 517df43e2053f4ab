//! Ingest service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `INGEST_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `INGEST_HOST` - Bind address (default: 127.0.0.1)
//! - `INGEST_PORT` - Listen port (default: 5000)
//! - `SHOPIFY_API_VERSION` - Admin REST API version (default: 2024-01)
//! - `SHOPIFY_PAGE_LIMIT` - Records fetched per collection, 1-250 (default: 50)
//! - `SHOPIFY_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `SHOPIFY_API_BASE_URL` - Override `https://{shop}` (mock servers, proxies)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::shopify::PageLimit;

const DEFAULT_API_VERSION: &str = "2024-01";
const DEFAULT_PAGE_LIMIT: &str = "50";
const DEFAULT_REQUEST_TIMEOUT_SECS: &str = "30";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Ingest service configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify Admin REST API configuration
    pub shopify: ShopifyApiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify Admin REST API configuration.
///
/// Holds no credentials: access tokens are per tenant and live in the store.
#[derive(Debug, Clone)]
pub struct ShopifyApiConfig {
    /// API version path segment (e.g., 2024-01)
    pub api_version: String,
    /// Records requested per collection
    pub page_limit: PageLimit,
    /// Timeout applied to every upstream request
    pub request_timeout: Duration,
    /// Replaces `https://{shop_domain}` when set
    pub base_url_override: Option<Url>,
}

impl Default for ShopifyApiConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            page_limit: PageLimit::default(),
            request_timeout: Duration::from_secs(30),
            base_url_override: None,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("INGEST_DATABASE_URL")?;
        let host = get_env_or_default("INGEST_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("INGEST_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("INGEST_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("INGEST_PORT".to_string(), e.to_string()))?;

        let shopify = ShopifyApiConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            shopify,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyApiConfig {
    /// Load the Shopify API section on its own.
    ///
    /// The CLI uses this directly since it has no server settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let page_limit = parse_page_limit(&get_env_or_default(
            "SHOPIFY_PAGE_LIMIT",
            DEFAULT_PAGE_LIMIT,
        ))?;

        let timeout_secs = get_env_or_default(
            "SHOPIFY_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPIFY_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let base_url_override = get_optional_env("SHOPIFY_API_BASE_URL")
            .map(|raw| parse_base_url(&raw))
            .transpose()?;

        Ok(Self {
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            page_limit,
            request_timeout: Duration::from_secs(timeout_secs),
            base_url_override,
        })
    }
}

/// Load only the database URL, for tools that never bind a socket.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `INGEST_DATABASE_URL` nor
/// `DATABASE_URL` is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("INGEST_DATABASE_URL")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_page_limit(raw: &str) -> Result<PageLimit, ConfigError> {
    let value = raw
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidEnvVar("SHOPIFY_PAGE_LIMIT".to_string(), e.to_string()))?;
    PageLimit::new(value)
        .map_err(|e| ConfigError::InvalidEnvVar("SHOPIFY_PAGE_LIMIT".to_string(), e.to_string()))
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidEnvVar("SHOPIFY_API_BASE_URL".to_string(), e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SHOPIFY_API_BASE_URL".to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url)
}
