//! Request parameters and upstream record shapes for the Admin REST API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use xeno_core::{ShopDomain, ShopifyId, SyncStage};

// =============================================================================
// Request Types
// =============================================================================

/// Errors that can occur when constructing a [`PageLimit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("page limit must be between 1 and {max}, got {value}", max = PageLimit::MAX)]
pub struct PageLimitError {
    value: u16,
}

/// Number of records requested from one collection endpoint.
///
/// Bounded by Shopify's maximum page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageLimit(u16);

impl PageLimit {
    /// Largest page the REST API will return.
    pub const MAX: u16 = 250;

    /// Create a page limit.
    ///
    /// # Errors
    ///
    /// Returns `PageLimitError` if `value` is zero or above [`PageLimit::MAX`].
    pub const fn new(value: u16) -> Result<Self, PageLimitError> {
        if value == 0 || value > Self::MAX {
            return Err(PageLimitError { value });
        }
        Ok(Self(value))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(50)
    }
}

/// A resource collection on the Admin REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Customers,
    Products,
    Orders,
}

impl Resource {
    /// Path relative to `/admin/api/{version}/`.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Customers => "customers.json",
            Self::Products => "products.json",
            Self::Orders => "orders.json",
        }
    }

    /// Top-level key holding the record array in the response body.
    #[must_use]
    pub const fn root_key(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }

    /// Query parameters sent in addition to `limit`.
    #[must_use]
    pub const fn extra_params(self) -> &'static [(&'static str, &'static str)] {
        match self {
            // Without this the API only returns open orders
            Self::Orders => &[("status", "any")],
            Self::Customers | Self::Products => &[],
        }
    }
}

impl From<SyncStage> for Resource {
    fn from(stage: SyncStage) -> Self {
        match stage {
            SyncStage::Customers => Self::Customers,
            SyncStage::Products => Self::Products,
            SyncStage::Orders => Self::Orders,
        }
    }
}

/// A tenant's shop domain paired with its access token.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopCredential {
    /// Shop domain (e.g., acme.myshopify.com).
    pub shop: ShopDomain,
    /// Admin API access token issued by OAuth (redacted in debug output).
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopCredential")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Upstream Record Types
// =============================================================================

/// A customer as returned by `GET /customers.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyCustomer {
    pub id: ShopifyId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Decimal string, e.g. `"199.65"`.
    #[serde(default)]
    pub total_spent: Option<Decimal>,
    #[serde(default)]
    pub orders_count: Option<i32>,
}

/// A product as returned by `GET /products.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyProduct {
    pub id: ShopifyId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub variants: Vec<ShopifyVariant>,
}

/// The subset of a product variant the sync reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyVariant {
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// An order as returned by `GET /orders.json?status=any`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOrder {
    pub id: ShopifyId,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    /// Absent for guest checkouts and POS sales without a customer.
    #[serde(default)]
    pub customer: Option<ShopifyOrderCustomer>,
}

/// The customer reference embedded in an order.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOrderCustomer {
    pub id: ShopifyId,
}
