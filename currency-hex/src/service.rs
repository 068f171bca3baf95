//! Currency Conversion Application Service
//!
//! Validates currency codes, resolves the rate through the rate source port
//! and renders the converted amount. Contains no HTTP or caching logic.

use rust_decimal::Decimal;

use currency_types::{
    Conversion, ConversionError, CurrencyCode, CurrencyRateSource, Locale, SupportedCurrencies,
};

/// Application service for currency conversion.
///
/// Generic over `S: CurrencyRateSource` so the resilient rate service can be
/// swapped for an in-memory source in tests.
pub struct ConversionService<S: CurrencyRateSource> {
    rates: S,
}

impl<S: CurrencyRateSource> ConversionService<S> {
    pub fn new(rates: S) -> Self {
        Self { rates }
    }

    /// Returns a reference to the underlying rate source.
    pub fn rates(&self) -> &S {
        &self.rates
    }

    /// Converts `value` from `source` to `target` and formats the result
    /// for `locale`.
    #[tracing::instrument(skip(self))]
    pub async fn convert(
        &self,
        source: Option<&str>,
        target: Option<&str>,
        value: Decimal,
        locale: Locale,
    ) -> Result<String, ConversionError> {
        let conversion = self.conversion(source, target, value).await?;
        let formatted = conversion.format(locale);
        tracing::debug!(result = %formatted, "Conversion done");
        Ok(formatted)
    }

    /// Converts `value` from `source` to `target` without formatting.
    ///
    /// Both codes are checked for shape before any upstream call and then
    /// against the supported set; the rate is only looked up for a valid,
    /// supported pair.
    pub async fn conversion(
        &self,
        source: Option<&str>,
        target: Option<&str>,
        value: Decimal,
    ) -> Result<Conversion, ConversionError> {
        let source = CurrencyCode::parse_required(source)?;
        let target = CurrencyCode::parse_required(target)?;

        let supported = self.rates.get_supported_currencies().await?;
        ensure_supported(&supported, &source)?;
        ensure_supported(&supported, &target)?;

        let rate = self.rates.get_currency_rate(&source, &target).await?;
        tracing::debug!(pair = %rate.pair, rate = rate.rate, as_of = %rate.as_of, "Rate resolved");

        rate.apply(value)
    }
}

fn ensure_supported(
    supported: &SupportedCurrencies,
    code: &CurrencyCode,
) -> Result<(), ConversionError> {
    if supported.contains(code) {
        Ok(())
    } else {
        Err(ConversionError::InvalidCurrency(format!(
            "Currency code not supported: {}",
            code
        )))
    }
}
