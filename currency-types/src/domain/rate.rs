//! Exchange rate domain model.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::currency::CurrencyCode;
use super::format::{Locale, format_currency};
use crate::error::ConversionError;

/// Ordered `(source, target)` currency pair. `USD->EUR` and `EUR->USD` are
/// distinct pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RatePair {
    pub source: CurrencyCode,
    pub target: CurrencyCode,
}

impl RatePair {
    pub fn new(source: CurrencyCode, target: CurrencyCode) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for RatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// Exchange rate for one pair as reported by the rate provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyRate {
    pub pair: RatePair,
    /// Units of `target` per one unit of `source`.
    pub rate: f64,
    pub as_of: NaiveDate,
}

impl CurrencyRate {
    /// Returns the rate as a decimal built from its shortest round-trip
    /// representation, so `0.85` becomes exactly `0.85`.
    ///
    /// Returns `None` for non-finite rates or rates outside the decimal range.
    pub fn as_decimal(&self) -> Option<Decimal> {
        if !self.rate.is_finite() {
            return None;
        }
        Decimal::from_str(&self.rate.to_string()).ok()
    }

    /// Converts `value` of the source currency into the target currency.
    pub fn apply(&self, value: Decimal) -> Result<Conversion, ConversionError> {
        let multiplier = self.as_decimal().ok_or_else(|| {
            ConversionError::Internal(format!(
                "rate {} for {} is not a usable decimal",
                self.rate, self.pair
            ))
        })?;
        let amount = value.checked_mul(multiplier).ok_or_else(|| {
            ConversionError::Internal(format!("converting {} {} overflows", value, self.pair))
        })?;

        Ok(Conversion {
            amount,
            rate: self.clone(),
        })
    }
}

/// Result of applying a rate to a value. `amount` is unrounded; rounding
/// happens when it is formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: Decimal,
    pub rate: CurrencyRate,
}

impl Conversion {
    pub fn currency(&self) -> &CurrencyCode {
        &self.rate.pair.target
    }

    /// Renders the amount as a currency string in `locale`.
    pub fn format(&self, locale: Locale) -> String {
        format_currency(self.amount, self.currency(), locale)
    }
}
