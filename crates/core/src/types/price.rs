//! Listing prices using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Zero or negative amount.
    #[error("price must be greater than zero")]
    NotPositive,
    /// More fractional digits than the ledger keeps.
    #[error("price may have at most {max} decimal places")]
    TooPrecise {
        /// Maximum allowed scale.
        max: u32,
    },
}

/// A strictly positive marketplace price.
///
/// Serialized as a decimal string so clients never see binary float
/// rounding.
///
/// ```
/// use mintgate_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(1999, 2)).unwrap();
/// assert_eq!(price.to_string(), "19.99");
/// assert!(Price::new(Decimal::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of decimal places.
    pub const MAX_SCALE: u32 = 8;

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns an error if `amount` is not positive or carries more than
    /// [`Self::MAX_SCALE`] decimal places.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount.normalize().scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise {
                max: Self::MAX_SCALE,
            });
        }
        Ok(Self(amount))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(Price::new(Decimal::ZERO), Err(PriceError::NotPositive));
        assert_eq!(Price::new(Decimal::new(-1, 0)), Err(PriceError::NotPositive));
    }

    #[test]
    fn test_rejects_excess_precision() {
        assert!(matches!(
            Price::new(Decimal::new(1, 10)),
            Err(PriceError::TooPrecise { max: 8 })
        ));
        // Trailing zeros do not count against the scale.
        assert!(Price::new(Decimal::new(1_000_000_000, 10)).is_ok());
    }

    #[test]
    fn test_serde_uses_decimal_string() {
        let price = Price::new(Decimal::new(250, 2)).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"2.50\"");
        let back: Price = serde_json::from_str("\"2.50\"").unwrap();
        assert_eq!(back, price);
        assert!(serde_json::from_str::<Price>("\"0\"").is_err());
    }
}
