//! Exchange rate ports.
//!
//! `RateProvider` is the raw upstream (one HTTP call per method call).
//! `CurrencyRateSource` is what the conversion service consumes; the
//! resilient, caching implementation lives in `currency-hex`.

use crate::domain::{CurrencyCode, CurrencyRate, SupportedCurrencies};
use crate::error::RateError;

/// Port trait for the upstream exchange rate provider.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Fetches the set of currency codes the provider supports.
    async fn fetch_supported_currencies(&self) -> Result<SupportedCurrencies, RateError>;

    /// Fetches the rate from `source` to `target`.
    async fn fetch_rate(
        &self,
        source: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<CurrencyRate, RateError>;
}

/// Port trait for rate lookups as seen by the conversion service.
#[async_trait::async_trait]
pub trait CurrencyRateSource: Send + Sync + 'static {
    async fn get_supported_currencies(&self) -> Result<SupportedCurrencies, RateError>;

    async fn get_currency_rate(
        &self,
        source: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<CurrencyRate, RateError>;
}
