//! Currency codes and the supported-currency snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::ConversionError;

/// A normalized three-letter currency code (e.g. `USD`).
///
/// Can only be built through [`CurrencyCode::parse`], which trims and
/// upper-cases the input, so every instance holds exactly three ASCII
/// uppercase letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Normalizes and validates a raw currency code.
    pub fn parse(raw: &str) -> Result<Self, ConversionError> {
        let cleaned = raw.trim().to_uppercase();

        if cleaned.is_empty() {
            return Err(ConversionError::InvalidCurrency(
                "Invalid currency code: currency code cannot be empty".into(),
            ));
        }

        if cleaned.len() != 3 || !cleaned.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConversionError::InvalidCurrency(format!(
                "Invalid currency code: {}",
                raw
            )));
        }

        Ok(Self(cleaned))
    }

    /// Validates an optional raw code, rejecting a missing one.
    pub fn parse_required(raw: Option<&str>) -> Result<Self, ConversionError> {
        match raw {
            Some(raw) => Self::parse(raw),
            None => Err(ConversionError::InvalidCurrency(
                "Currency code cannot be null".into(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Immutable snapshot of the currencies the rate provider supports.
///
/// Cloning is cheap; a refresh replaces the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedCurrencies(Arc<BTreeSet<CurrencyCode>>);

impl SupportedCurrencies {
    pub fn new(codes: impl IntoIterator<Item = CurrencyCode>) -> Self {
        Self(Arc::new(codes.into_iter().collect()))
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CurrencyCode> for SupportedCurrencies {
    fn from_iter<T: IntoIterator<Item = CurrencyCode>>(iter: T) -> Self {
        Self::new(iter)
    }
}
