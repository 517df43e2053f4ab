//! Storefront domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input has no dot separating labels.
    #[error("shop domain must contain at least one dot")]
    MissingDot,
    /// The input contains a character outside `[a-z0-9.-]`.
    #[error("shop domain contains invalid character {0:?}")]
    InvalidCharacter(char),
    /// A label (text between dots) is empty or starts/ends with a hyphen.
    #[error("shop domain has an empty or malformed label")]
    MalformedLabel,
}

/// A storefront domain such as `acme.myshopify.com`.
///
/// Tenants are looked up by this value, so it is normalized on parse:
/// surrounding whitespace is trimmed, a leading `https://` or `http://` and a
/// trailing `/` are stripped, and the result is lowercased.
///
/// ## Examples
///
/// ```
/// use xeno_core::ShopDomain;
///
/// let shop = ShopDomain::parse("https://Acme.myshopify.com/").unwrap();
/// assert_eq!(shop.as_str(), "acme.myshopify.com");
///
/// assert!(ShopDomain::parse("").is_err());
/// assert!(ShopDomain::parse("localhost").is_err());
/// assert!(ShopDomain::parse("acme.myshopify.com/admin").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Maximum length of a DNS name.
    pub const MAX_LENGTH: usize = 253;

    /// Parse and normalize a `ShopDomain` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the normalized input is empty, too long, has no
    /// dot, contains characters other than ASCII letters, digits, `.` and `-`,
    /// or has an empty or hyphen-bounded label.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let lowered = s.trim().to_ascii_lowercase();
        let without_scheme = lowered
            .strip_prefix("https://")
            .or_else(|| lowered.strip_prefix("http://"))
            .unwrap_or(&lowered);
        let host = without_scheme
            .strip_suffix('/')
            .unwrap_or(without_scheme)
            .to_owned();

        if host.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if host.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = host
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
        {
            return Err(ShopDomainError::InvalidCharacter(c));
        }

        if !host.contains('.') {
            return Err(ShopDomainError::MissingDot);
        }

        if host
            .split('.')
            .any(|label| label.is_empty() || label.starts_with('-') || label.ends_with('-'))
        {
            return Err(ShopDomainError::MalformedLabel);
        }

        Ok(Self(host))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(domain: ShopDomain) -> Self {
        domain.0
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShopDomain {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShopDomain {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
