//! Caching, retrying, circuit-broken rate source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use currency_types::{
    CurrencyCode, CurrencyRate, CurrencyRateSource, RateError, RatePair, RateProvider,
    SupportedCurrencies,
};

use super::cache::FlightCache;
use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::retry::{ResilientCall, RetryPolicy};

/// Resilience settings for upstream rate calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ResilienceConfig {
    pub supported_currencies_retry: RetryPolicy,
    pub currency_rate_retry: RetryPolicy,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Served when supported currencies cannot be fetched. Never cached.
    pub supported_currencies_fallback: Option<SupportedCurrencies>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            supported_currencies_retry: RetryPolicy::new(5, Duration::from_millis(500)),
            currency_rate_retry: RetryPolicy::new(3, Duration::from_millis(300)),
            circuit_breaker: CircuitBreakerConfig::default(),
            supported_currencies_fallback: None,
        }
    }
}

/// [`CurrencyRateSource`] over a raw [`RateProvider`].
///
/// Both lookups are memoized until evicted and deduplicated while in
/// flight. Cache misses go upstream through retries and one circuit breaker
/// shared by both operations. Cloning is cheap and shares all state.
pub struct ResilientRateService<P: RateProvider> {
    provider: Arc<P>,
    breaker: Arc<CircuitBreaker>,
    supported: Arc<FlightCache<(), SupportedCurrencies>>,
    rates: Arc<FlightCache<RatePair, CurrencyRate>>,
    config: Arc<ResilienceConfig>,
}

impl<P: RateProvider> Clone for ResilientRateService<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            breaker: self.breaker.clone(),
            supported: self.supported.clone(),
            rates: self.rates.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P: RateProvider> ResilientRateService<P> {
    pub fn new(provider: P, config: ResilienceConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            breaker: Arc::new(CircuitBreaker::new(
                "currency_rates_api",
                config.circuit_breaker,
            )),
            supported: Arc::new(FlightCache::new("supported_currencies")),
            rates: Arc::new(FlightCache::new("currency_rates")),
            config: Arc::new(config),
        }
    }

    /// Returns the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn cached_rate_count(&self) -> usize {
        self.rates.len()
    }

    /// Drops the cached supported currency set.
    pub fn evict_supported_currencies(&self) {
        tracing::info!("Evicting supported currencies cache");
        self.supported.clear();
    }

    /// Drops every cached rate pair.
    pub fn evict_currency_rates(&self) {
        tracing::info!(entries = self.rates.len(), "Evicting currency rates cache");
        self.rates.clear();
    }

    async fn supported_currencies(&self) -> Result<SupportedCurrencies, RateError> {
        let provider = self.provider.clone();
        let breaker = self.breaker.clone();
        let policy = self.config.supported_currencies_retry;

        let fetched = self
            .supported
            .get_or_fetch((), move || async move {
                ResilientCall::new("supported_currencies", &breaker, policy)
                    .run(|| provider.fetch_supported_currencies())
                    .await
            })
            .await;

        match (fetched, &self.config.supported_currencies_fallback) {
            (Ok(currencies), _) => Ok(currencies),
            (Err(e), Some(fallback)) => {
                tracing::warn!(
                    error = %e,
                    fallback = fallback.len(),
                    "Serving fallback supported currencies"
                );
                Ok(fallback.clone())
            }
            (Err(e), None) => Err(e),
        }
    }

    async fn currency_rate(
        &self,
        source: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<CurrencyRate, RateError> {
        let pair = RatePair::new(source.clone(), target.clone());
        let provider = self.provider.clone();
        let breaker = self.breaker.clone();
        let policy = self.config.currency_rate_retry;
        let (source, target) = (source.clone(), target.clone());

        self.rates
            .get_or_fetch(pair, move || async move {
                ResilientCall::new("currency_rate", &breaker, policy)
                    .run(|| provider.fetch_rate(&source, &target))
                    .await
            })
            .await
    }
}

#[async_trait]
impl<P: RateProvider> CurrencyRateSource for ResilientRateService<P> {
    async fn get_supported_currencies(&self) -> Result<SupportedCurrencies, RateError> {
        self.supported_currencies().await
    }

    async fn get_currency_rate(
        &self,
        source: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<CurrencyRate, RateError> {
        self.currency_rate(source, target).await
    }
}
