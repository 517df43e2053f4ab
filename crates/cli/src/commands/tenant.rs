//! Tenant onboarding.
//!
//! Stands in for the OAuth install flow: stores a shop's Admin API access
//! token so the pipeline can sync it.

use secrecy::SecretString;
use xeno_core::ShopDomain;
use xeno_ingest::db::{CommerceStore, PgStore};

use super::{CommandError, connect};

/// Create a tenant, or replace its token and reactivate it.
///
/// # Errors
///
/// Returns `CommandError` if the domain is invalid, the token is blank, or
/// the write fails.
pub async fn register(shop: &str, token: String) -> Result<(), CommandError> {
    let shop = ShopDomain::parse(shop)?;
    if token.trim().is_empty() {
        return Err(CommandError::InvalidArgument(
            "access token must not be blank".to_string(),
        ));
    }

    let store = PgStore::new(connect().await?);
    let tenant = store
        .upsert_tenant(&shop, &SecretString::from(token))
        .await?;

    tracing::info!(
        tenant_id = %tenant.id,
        shop = %tenant.shop_domain,
        "Tenant registered"
    );
    Ok(())
}
