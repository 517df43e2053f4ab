//! Upstream resource identifiers.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a [`ShopifyId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopifyIdError {
    /// The input string is empty.
    #[error("shopify id cannot be empty")]
    Empty,
    /// The input is neither a decimal number nor a `gid://shopify/...` URI.
    #[error("shopify id must be numeric or a gid:// URI, got {0:?}")]
    Invalid(String),
}

/// An upstream resource ID, stored as its decimal string form.
///
/// The REST API returns numeric IDs while the GraphQL API returns global IDs
/// like `gid://shopify/Customer/123`. Both normalize to `"123"`, which is the
/// value used in natural keys.
///
/// ```
/// use xeno_core::ShopifyId;
///
/// let a: ShopifyId = serde_json::from_str("207119551").unwrap();
/// let b: ShopifyId = serde_json::from_str("\"gid://shopify/Customer/207119551\"").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "207119551");
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ShopifyId(String);

impl ShopifyId {
    /// Parse a `ShopifyId` from a numeric string or a global ID URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or does not end in a run of
    /// ASCII digits.
    pub fn parse(s: &str) -> Result<Self, ShopifyIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShopifyIdError::Empty);
        }

        let tail = if s.starts_with("gid://") {
            // Global IDs may carry a query string, e.g. `?inventory=1`
            let path = s.split('?').next().unwrap_or(s);
            path.rsplit('/').next().unwrap_or("")
        } else {
            s
        };

        if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ShopifyIdError::Invalid(s.to_owned()));
        }

        Ok(Self(tail.to_owned()))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for ShopifyId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ShopifyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopifyId {
    type Err = ShopifyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ShopifyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ShopifyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self::from(n)),
            Raw::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShopifyId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShopifyId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShopifyId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
