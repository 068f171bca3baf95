//! # Rates Client
//!
//! A typed Rust client for the external currency rate API.
//!
//! Implements the [`RateProvider`] port: one HTTP request per call, no
//! caching and no retries. Resilience is layered on top in `currency-hex`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use currency_types::{
    CurrencyCode, CurrencyRate, RateError, RatePair, RateProvider, SupportedCurrencies,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: HTTP {status}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for RateError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, body } => RateError::Upstream {
                message: format!("HTTP {}", status),
                status: Some(status),
                body: Some(body),
            },
            other => RateError::upstream(other.to_string()),
        }
    }
}

/// Currency descriptor as returned by `GET /currencies`.
#[derive(Debug, Deserialize)]
struct CurrencyDto {
    code: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// Rate object as returned by `GET /rates/{source}/{target}`.
#[derive(Debug, Deserialize)]
struct CurrencyRateDto {
    base_currency: String,
    quote_currency: String,
    quote: f64,
    date: NaiveDate,
}

/// Currency rate API client.
pub struct RatesApiClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    http: Client,
}

impl RatesApiClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            http: Client::new(),
        }
    }

    /// Sets the timeout applied to every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Performs a GET request. An empty or `null` body yields `Ok(None)`.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("ApiKey {}", self.api_key))
            .timeout(self.timeout)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<Option<T>, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        trace!(status = status.as_u16(), body = %body, "Rate API response");

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RateProvider for RatesApiClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_supported_currencies(&self) -> Result<SupportedCurrencies, RateError> {
        debug!("Getting supported currencies from API");
        let currencies: Vec<CurrencyDto> = self
            .get("/currencies")
            .await?
            .ok_or_else(|| RateError::NullResult("supported currencies".into()))?;

        let supported: SupportedCurrencies = currencies
            .into_iter()
            .filter_map(|dto| match CurrencyCode::parse(&dto.code) {
                Ok(code) => {
                    if !dto.active {
                        debug!(code = %code, "Rate API lists currency as inactive");
                    }
                    Some(code)
                }
                Err(e) => {
                    warn!(code = %dto.code, "Skipping malformed currency from rate API: {}", e);
                    None
                }
            })
            .collect();

        debug!(count = supported.len(), "Got supported currencies from API");
        Ok(supported)
    }

    #[tracing::instrument(skip_all, fields(source = %source, target = %target))]
    async fn fetch_rate(
        &self,
        source: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<CurrencyRate, RateError> {
        let pair = RatePair::new(source.clone(), target.clone());
        debug!("Getting currency rate from API");

        let dto: CurrencyRateDto = self
            .get(&format!("/rates/{}/{}", source, target))
            .await?
            .ok_or_else(|| RateError::NullResult(format!("currency rate {}", pair)))?;

        if !dto.base_currency.eq_ignore_ascii_case(source.as_str())
            || !dto.quote_currency.eq_ignore_ascii_case(target.as_str())
        {
            return Err(RateError::upstream(format!(
                "requested rate {} but received {}->{}",
                pair, dto.base_currency, dto.quote_currency
            )));
        }

        if !dto.quote.is_finite() || dto.quote <= 0.0 {
            return Err(RateError::upstream(format!(
                "invalid quote {} for {}",
                dto.quote, pair
            )));
        }

        Ok(CurrencyRate {
            pair,
            rate: dto.quote,
            as_of: dto.date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "test-key";

    const CURRENCIES_JSON: &str = r#"[
        {"code": "USD", "numeric_code": "840", "decimal_digits": 2, "name": "US Dollar", "active": true},
        {"code": "EUR", "numeric_code": "978", "decimal_digits": 2, "name": "Euro", "active": true},
        {"code": "BOGUS", "numeric_code": "000", "decimal_digits": 2, "name": "Broken", "active": false}
    ]"#;

    const RATE_JSON: &str = r#"{
        "base_currency": "USD",
        "quote_currency": "EUR",
        "quote": 0.85,
        "date": "2024-05-01"
    }"#;

    fn code(raw: &str) -> CurrencyCode {
        CurrencyCode::parse(raw).unwrap()
    }

    async fn mock_get(server: &MockServer, request_path: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .and(header("Authorization", "ApiKey test-key"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = RatesApiClient::new("http://localhost:3000/", API_KEY);
        assert_eq!(client.base_url, "http://localhost:3000");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_fetch_supported_currencies() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/currencies",
            ResponseTemplate::new(200).set_body_string(CURRENCIES_JSON),
        )
        .await;

        let client = RatesApiClient::new(server.uri(), API_KEY);
        let supported = client.fetch_supported_currencies().await.unwrap();

        assert_eq!(supported.len(), 2);
        assert!(supported.contains(&code("USD")));
        assert!(supported.contains(&code("EUR")));
    }

    #[tokio::test]
    async fn test_fetch_rate() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/rates/USD/EUR",
            ResponseTemplate::new(200).set_body_string(RATE_JSON),
        )
        .await;

        let client = RatesApiClient::new(server.uri(), API_KEY);
        let rate = client.fetch_rate(&code("USD"), &code("EUR")).await.unwrap();

        assert_eq!(rate.rate, 0.85);
        assert_eq!(rate.pair.to_string(), "USD->EUR");
        assert_eq!(rate.as_of, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[tokio::test]
    async fn test_missing_api_key_header_is_not_matched() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/currencies",
            ResponseTemplate::new(200).set_body_string(CURRENCIES_JSON),
        )
        .await;

        // Wrong key: the mock does not match and wiremock answers 404.
        let client = RatesApiClient::new(server.uri(), "other-key");
        let err = client.fetch_supported_currencies().await.unwrap_err();

        assert!(matches!(err, RateError::Upstream { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/rates/USD/EUR",
            ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid api key"}"#),
        )
        .await;

        let client = RatesApiClient::new(server.uri(), API_KEY);
        let err = client.fetch_rate(&code("USD"), &code("EUR")).await.unwrap_err();

        match err {
            RateError::Upstream { status, body, .. } => {
                assert_eq!(status, Some(401));
                assert_eq!(body.as_deref(), Some(r#"{"error":"invalid api key"}"#));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_null_body_is_null_result() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/rates/USD/EUR",
            ResponseTemplate::new(200).set_body_string("null"),
        )
        .await;
        mock_get(&server, "/currencies", ResponseTemplate::new(200)).await;

        let client = RatesApiClient::new(server.uri(), API_KEY);

        let err = client.fetch_rate(&code("USD"), &code("EUR")).await.unwrap_err();
        assert!(matches!(err, RateError::NullResult(_)));

        let err = client.fetch_supported_currencies().await.unwrap_err();
        assert!(matches!(err, RateError::NullResult(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream_error() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/rates/USD/EUR",
            ResponseTemplate::new(200).set_body_string(r#"{"quote": "abc"}"#),
        )
        .await;

        let client = RatesApiClient::new(server.uri(), API_KEY);
        let err = client.fetch_rate(&code("USD"), &code("EUR")).await.unwrap_err();

        assert!(matches!(err, RateError::Upstream { status: None, .. }));
    }

    #[tokio::test]
    async fn test_non_positive_quote_is_rejected() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/rates/USD/EUR",
            ResponseTemplate::new(200).set_body_string(
                r#"{"base_currency":"USD","quote_currency":"EUR","quote":0.0,"date":"2024-05-01"}"#,
            ),
        )
        .await;

        let client = RatesApiClient::new(server.uri(), API_KEY);
        let err = client.fetch_rate(&code("USD"), &code("EUR")).await.unwrap_err();

        assert!(matches!(err, RateError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_mismatched_pair_is_rejected() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/rates/USD/GBP",
            ResponseTemplate::new(200).set_body_string(RATE_JSON),
        )
        .await;

        let client = RatesApiClient::new(server.uri(), API_KEY);
        let err = client.fetch_rate(&code("USD"), &code("GBP")).await.unwrap_err();

        assert!(err.to_string().contains("USD->GBP"));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/currencies",
            ResponseTemplate::new(200)
                .set_body_string(CURRENCIES_JSON)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let client =
            RatesApiClient::new(server.uri(), API_KEY).with_timeout(Duration::from_millis(50));
        let err = client.fetch_supported_currencies().await.unwrap_err();

        assert!(matches!(err, RateError::Upstream { status: None, .. }));
    }
}
