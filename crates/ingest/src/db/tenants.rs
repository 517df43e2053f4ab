//! Tenant repository for database operations.
//!
//! Tenants are written by the OAuth install flow (or `xeno-cli tenant
//! register`) and only read by the sync pipeline.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use xeno_core::{ShopDomain, TenantId};

use crate::shopify::ShopCredential;

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// An onboarded storefront.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct Tenant {
    pub id: TenantId,
    /// Shop domain (e.g., acme.myshopify.com).
    pub shop_domain: ShopDomain,
    /// OAuth access token (redacted in debug output).
    pub access_token: Option<SecretString>,
    /// Cleared when the app is uninstalled.
    pub is_active: bool,
}

impl Tenant {
    /// The credential to call Shopify with, if this tenant can be synced.
    ///
    /// Returns `None` for inactive tenants and for missing or blank tokens.
    #[must_use]
    pub fn credential(&self) -> Option<ShopCredential> {
        if !self.is_active {
            return None;
        }

        let token = self.access_token.as_ref()?;
        if token.expose_secret().trim().is_empty() {
            return None;
        }

        Some(ShopCredential {
            shop: self.shop_domain.clone(),
            access_token: token.clone(),
        })
    }
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("shop_domain", &self.shop_domain)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: TenantId,
    shop_domain: String,
    access_token: Option<String>,
    is_active: bool,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = RepositoryError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let shop_domain = ShopDomain::parse(&row.shop_domain).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop domain in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            shop_domain,
            access_token: row.access_token.map(SecretString::from),
            is_active: row.is_active,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for tenant database operations.
pub struct TenantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TenantRepository<'a> {
    /// Create a new tenant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a tenant by shop domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_domain(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r"
            SELECT id, shop_domain, access_token, is_active
            FROM ingest.tenant
            WHERE shop_domain = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Tenant::try_from).transpose()
    }

    /// Save or refresh a tenant's access token.
    ///
    /// Re-installing the app reactivates the tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Tenant, RepositoryError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r"
            INSERT INTO ingest.tenant (shop_domain, access_token, is_active)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (shop_domain) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING id, shop_domain, access_token, is_active
            ",
        )
        .bind(shop.as_str())
        .bind(access_token.expose_secret())
        .fetch_one(self.pool)
        .await?;

        Tenant::try_from(row)
    }
}
