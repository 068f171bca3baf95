//! Configuration loading from environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};

use currency_hex::inbound::ServerSettings;
use currency_hex::resilience::{
    CircuitBreakerConfig, EvictionSchedule, ResilienceConfig, RetryPolicy,
};
use currency_types::{CurrencyCode, Locale, SupportedCurrencies};

/// Connection settings of the upstream rate API.
#[derive(Debug, Clone)]
pub struct RatesApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub server: ServerSettings,
    pub rates_api: RatesApiConfig,
    pub eviction: EvictionSchedule,
    pub resilience: ResilienceConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let vars = Vars(&lookup);

        let port = vars.parsed("PORT", 8080u16)?;

        let server = ServerSettings {
            service_name: vars
                .get("SERVICE_NAME")
                .unwrap_or_else(|| "currency-api".to_string()),
            api_key: vars.required("API_KEY")?,
            default_locale: match vars.get("DEFAULT_LOCALE") {
                Some(tag) => tag.parse::<Locale>().map_err(|e| anyhow!("DEFAULT_LOCALE: {}", e))?,
                None => Locale::default(),
            },
        };
        if server.service_name.trim_matches('/').is_empty() {
            bail!("SERVICE_NAME cannot be empty");
        }

        let rates_api = RatesApiConfig {
            base_url: vars.required("CURRENCY_RATES_API_BASE_URL")?,
            api_key: vars.required("CURRENCY_RATES_API_KEY")?,
            timeout: vars.millis("CURRENCY_RATES_API_TIMEOUT_MS", 5_000)?,
        };

        let eviction = EvictionSchedule {
            supported_currencies_ttl: vars.millis("SUPPORTED_CURRENCIES_CACHE_TTL_MS", 86_400_000)?,
            currency_rates_ttl: vars.millis("CURRENCY_RATES_CACHE_TTL_MS", 3_600_000)?,
        };

        let failure_rate_threshold = vars.parsed("CIRCUIT_BREAKER_FAILURE_RATE_THRESHOLD", 60.0)?;
        if !(failure_rate_threshold > 0.0 && failure_rate_threshold <= 100.0) {
            bail!("CIRCUIT_BREAKER_FAILURE_RATE_THRESHOLD must be in (0, 100]");
        }

        let resilience = ResilienceConfig {
            supported_currencies_retry: vars.retry("SUPPORTED_CURRENCIES_RETRY", 5, 500)?,
            currency_rate_retry: vars.retry("CURRENCY_RATES_RETRY", 3, 300)?,
            circuit_breaker: CircuitBreakerConfig {
                failure_rate_threshold,
                sliding_window_size: vars.positive("CIRCUIT_BREAKER_SLIDING_WINDOW_SIZE", 5)?,
                open_duration: vars.millis("CIRCUIT_BREAKER_OPEN_DURATION_MS", 30_000)?,
                half_open_calls: vars.positive("CIRCUIT_BREAKER_HALF_OPEN_CALLS", 2)?,
            },
            supported_currencies_fallback: vars
                .get("SUPPORTED_CURRENCIES_FALLBACK")
                .map(|raw| parse_currency_list(&raw))
                .transpose()
                .context("SUPPORTED_CURRENCIES_FALLBACK")?,
        };

        Ok(Self {
            port,
            server,
            rates_api,
            eviction,
            resilience,
        })
    }
}

/// Typed accessors over a variable lookup. Blank values count as unset.
struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("{} environment variable is required", key))
    }

    fn parsed<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow!("{}: invalid value '{}': {}", key, raw, e)),
            None => Ok(default),
        }
    }

    fn positive(&self, key: &str, default: usize) -> anyhow::Result<usize> {
        let value = self.parsed(key, default)?;
        if value == 0 {
            bail!("{} must be greater than zero", key);
        }
        Ok(value)
    }

    fn millis(&self, key: &str, default: u64) -> anyhow::Result<Duration> {
        let value: u64 = self.parsed(key, default)?;
        if value == 0 {
            bail!("{} must be greater than zero", key);
        }
        Ok(Duration::from_millis(value))
    }

    /// Reads `{prefix}_MAX_ATTEMPTS` and `{prefix}_BACKOFF_MS`.
    fn retry(&self, prefix: &str, attempts: u32, backoff_ms: u64) -> anyhow::Result<RetryPolicy> {
        let attempts_key = format!("{}_MAX_ATTEMPTS", prefix);
        let max_attempts: u32 = self.parsed(&attempts_key, attempts)?;
        if max_attempts == 0 {
            bail!("{} must be at least 1", attempts_key);
        }
        let backoff: u64 = self.parsed(&format!("{}_BACKOFF_MS", prefix), backoff_ms)?;
        Ok(RetryPolicy::new(max_attempts, Duration::from_millis(backoff)))
    }
}

fn parse_currency_list(raw: &str) -> anyhow::Result<SupportedCurrencies> {
    let codes = raw
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| CurrencyCode::parse(code).map_err(|e| anyhow!(e)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if codes.is_empty() {
        bail!("fallback currency list is empty");
    }
    Ok(SupportedCurrencies::new(codes))
}
