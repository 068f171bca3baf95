//! Integration tests for the convert endpoint.
//!
//! The full stack is assembled: HTTP router, conversion service, resilient
//! rate service and the real rate API client talking to a wiremock server.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use currency_hex::ConversionService;
use currency_hex::inbound::{HttpServer, ServerSettings};
use currency_hex::resilience::{ResilienceConfig, ResilientRateService, RetryPolicy};
use currency_types::Locale;
use rates_client::RatesApiClient;

const API_KEY: &str = "client-key";

/// Helper to build a server backed by `upstream`, with fast retries.
fn create_test_server(upstream: &MockServer) -> TestServer {
    let client = RatesApiClient::new(upstream.uri(), "upstream-key");
    let config = ResilienceConfig {
        supported_currencies_retry: RetryPolicy::new(2, Duration::from_millis(1)),
        currency_rate_retry: RetryPolicy::new(2, Duration::from_millis(1)),
        ..ResilienceConfig::default()
    };
    let rates = ResilientRateService::new(client, config);

    HttpServer::new(
        ConversionService::new(rates),
        ServerSettings {
            service_name: "currency-api".into(),
            api_key: API_KEY.into(),
            default_locale: Locale::EnUs,
        },
    )
}

async fn mount_currencies(upstream: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/currencies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"code": "USD", "numeric_code": "840", "decimal_digits": 2, "name": "US Dollar", "active": true},
            {"code": "EUR", "numeric_code": "978", "decimal_digits": 2, "name": "Euro", "active": true},
            {"code": "JPY", "numeric_code": "392", "decimal_digits": 0, "name": "Yen", "active": true}
        ])))
        .expect(expected_calls)
        .mount(upstream)
        .await;
}

async fn mount_rate(
    upstream: &MockServer,
    source: &str,
    target: &str,
    quote: f64,
    expected_calls: u64,
) {
    Mock::given(method("GET"))
        .and(path(format!("/rates/{}/{}", source, target)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base_currency": source,
            "quote_currency": target,
            "quote": quote,
            "date": "2024-05-01"
        })))
        .expect(expected_calls)
        .mount(upstream)
        .await;
}

fn convert_request(query: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/currency-api/convert?{}", query))
        .header("X-API-KEY", API_KEY)
        .body(Body::empty())
        .unwrap()
}

type TestServer = HttpServer<ResilientRateService<RatesApiClient>>;

async fn send(server: &TestServer, request: Request<Body>) -> (StatusCode, Value) {
    let response = server.router().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

// ─────────────────────────────────────────────────────────────────────────────
// Health and security
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_needs_no_api_key() {
    let upstream = MockServer::start().await;
    let server = create_test_server(&upstream);

    let response = server
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_SECURITY_POLICY).unwrap(),
        "default-src 'self'"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_convert_without_api_key_is_unauthorized() {
    let upstream = MockServer::start().await;
    let server = create_test_server(&upstream);

    let request = Request::builder()
        .uri("/currency-api/convert?source=USD&target=EUR&value=100")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&server, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"status": "fail", "message": "Missing API key"}));
}

#[tokio::test]
async fn test_convert_with_wrong_api_key_is_unauthorized() {
    let upstream = MockServer::start().await;
    let server = create_test_server(&upstream);

    let request = Request::builder()
        .uri("/currency-api/convert?source=USD&target=EUR&value=100")
        .header("X-API-KEY", "nope")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&server, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid API key");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let upstream = MockServer::start().await;
    let server = create_test_server(&upstream);

    let request = Request::builder()
        .uri("/currency-api/openapi.json")
        .header("X-API-KEY", API_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&server, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/currency-api/convert"].is_object());
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_success() {
    let upstream = MockServer::start().await;
    mount_currencies(&upstream, 1).await;
    mount_rate(&upstream, "USD", "EUR", 0.85, 1).await;
    let server = create_test_server(&upstream);

    let (status, body) = send(&server, convert_request("source=USD&target=EUR&value=100")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success", "data": {"result": "€85.00"}}));
}

#[tokio::test]
async fn test_convert_uses_accept_language() {
    let upstream = MockServer::start().await;
    mount_currencies(&upstream, 1).await;
    mount_rate(&upstream, "USD", "EUR", 0.85, 1).await;
    let server = create_test_server(&upstream);

    let mut request = convert_request("source=usd&target=eur&value=1234.5");
    request
        .headers_mut()
        .insert(header::ACCEPT_LANGUAGE, "fi-FI,fi;q=0.9,en;q=0.5".parse().unwrap());
    let (status, body) = send(&server, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], "1\u{a0}049,32\u{a0}€");
}

#[tokio::test]
async fn test_repeated_conversions_hit_the_cache() {
    let upstream = MockServer::start().await;
    mount_currencies(&upstream, 1).await;
    mount_rate(&upstream, "USD", "JPY", 151.37, 1).await;
    let server = create_test_server(&upstream);

    for value in ["1", "10", "100"] {
        let (status, _) = send(
            &server,
            convert_request(&format!("source=USD&target=JPY&value={}", value)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    // `expect(1)` on both mocks is verified when `upstream` drops.
}

// ─────────────────────────────────────────────────────────────────────────────
// Client errors
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unsupported_currency_is_fail() {
    let upstream = MockServer::start().await;
    mount_currencies(&upstream, 1).await;
    let server = create_test_server(&upstream);

    let (status, body) = send(&server, convert_request("source=GBP&target=EUR&value=1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"status": "fail", "message": "Currency code not supported: GBP"})
    );
}

#[tokio::test]
async fn test_malformed_currency_never_reaches_upstream() {
    let upstream = MockServer::start().await;
    mount_currencies(&upstream, 0).await;
    let server = create_test_server(&upstream);

    let (status, body) = send(&server, convert_request("source=US&target=EUR&value=1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Invalid currency code: US");
}

#[tokio::test]
async fn test_missing_source_is_fail() {
    let upstream = MockServer::start().await;
    mount_currencies(&upstream, 0).await;
    let server = create_test_server(&upstream);

    let (status, body) = send(&server, convert_request("target=EUR&value=1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Currency code cannot be null");
}

#[tokio::test]
async fn test_missing_or_bad_value_is_fail() {
    let upstream = MockServer::start().await;
    mount_currencies(&upstream, 0).await;
    let server = create_test_server(&upstream);

    let (status, body) = send(&server, convert_request("source=USD&target=EUR")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");

    let (status, body) = send(&server, convert_request("source=USD&target=EUR&value=ten")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid value: ten");
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream errors
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upstream_error_body_is_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/currencies"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid api key"})),
        )
        // Retried once more before giving up.
        .expect(2)
        .mount(&upstream)
        .await;
    let server = create_test_server(&upstream);

    let (status, body) = send(&server, convert_request("source=USD&target=EUR&value=1")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], 500);
    assert_eq!(body["data"], json!({"error": "invalid api key"}));
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Could not get a valid response from external currency rate API")
    );
}

#[tokio::test]
async fn test_failed_rate_is_retried_on_next_request() {
    let upstream = MockServer::start().await;
    mount_currencies(&upstream, 1).await;
    Mock::given(method("GET"))
        .and(path("/rates/USD/EUR"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&upstream)
        .await;
    mount_rate(&upstream, "USD", "EUR", 0.85, 1).await;
    let server = create_test_server(&upstream);

    let (status, body) = send(&server, convert_request("source=USD&target=EUR&value=100")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("data").is_none());

    let (status, body) = send(&server, convert_request("source=USD&target=EUR&value=100")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], "€85.00");
}
