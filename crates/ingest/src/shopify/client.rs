//! HTTP client for the Admin REST API collection endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::config::ShopifyApiConfig;

use super::{PageLimit, Resource, ShopCredential, ShopifyError};

/// Source of raw upstream records, one collection page at a time.
///
/// [`RestClient`] is the production implementation; tests substitute
/// scripted sources.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Fetch up to `limit` raw records of `resource` for one tenant.
    ///
    /// # Errors
    ///
    /// Returns a [`ShopifyError`] whose [`ShopifyError::failure`] tells the
    /// caller whether the credential, the network or the payload was at fault.
    async fn fetch_collection(
        &self,
        credential: &ShopCredential,
        resource: Resource,
        limit: PageLimit,
    ) -> Result<Vec<Value>, ShopifyError>;
}

/// Shopify Admin REST API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    client: reqwest::Client,
    api_version: String,
    base_url_override: Option<Url>,
}

impl RestClient {
    /// Create a new REST client.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyApiConfig) -> Result<Self, ShopifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("xeno-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(RestClientInner {
                client,
                api_version: config.api_version.clone(),
                base_url_override: config.base_url_override.clone(),
            }),
        })
    }

    /// Build the collection URL for a shop.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::InvalidUrl` if the base URL cannot be parsed.
    pub fn collection_url(
        &self,
        credential: &ShopCredential,
        resource: Resource,
        limit: PageLimit,
    ) -> Result<Url, ShopifyError> {
        let base = match &self.inner.base_url_override {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None => format!("https://{}", credential.shop),
        };

        let mut url = Url::parse(&format!(
            "{base}/admin/api/{}/{}",
            self.inner.api_version,
            resource.path()
        ))?;

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in resource.extra_params() {
                query.append_pair(key, value);
            }
            query.append_pair("limit", &limit.get().to_string());
        }

        Ok(url)
    }
}

#[async_trait]
impl UpstreamSource for RestClient {
    #[instrument(
        skip_all,
        fields(shop = %credential.shop, resource = resource.root_key(), limit = limit.get())
    )]
    async fn fetch_collection(
        &self,
        credential: &ShopCredential,
        resource: Resource,
        limit: PageLimit,
    ) -> Result<Vec<Value>, ShopifyError> {
        let token = credential.access_token.expose_secret();
        if token.trim().is_empty() {
            return Err(ShopifyError::MissingAccessToken(
                credential.shop.to_string(),
            ));
        }

        let url = self.collection_url(credential, resource, limit)?;

        let response = self
            .inner
            .client
            .get(url)
            .header("X-Shopify-Access-Token", token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map_or(2, |secs: f64| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let secs = secs.ceil().max(0.0) as u64;
                    secs
                });
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            return Err(ShopifyError::AuthRejected {
                status: status.as_u16(),
                message,
            });
        }

        if status.is_server_error() {
            return Err(ShopifyError::Server(status.as_u16()));
        }

        if !status.is_success() {
            return Err(ShopifyError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        let records = parse_collection(&body, resource)?;

        tracing::debug!(records = records.len(), "Fetched collection");
        Ok(records)
    }
}

/// Extract the record array from a collection response body.
///
/// # Errors
///
/// Returns `ShopifyError::Parse` if the body is not JSON and
/// `ShopifyError::Protocol` if the top-level key is missing or not an array.
pub fn parse_collection(body: &[u8], resource: Resource) -> Result<Vec<Value>, ShopifyError> {
    let mut document: Value = serde_json::from_slice(body)?;
    let key = resource.root_key();

    match document.get_mut(key).map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        Some(other) => Err(ShopifyError::Protocol(format!(
            "`{key}` is {}, expected an array",
            json_kind(&other)
        ))),
        None => Err(ShopifyError::Protocol(format!(
            "response has no `{key}` key"
        ))),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
