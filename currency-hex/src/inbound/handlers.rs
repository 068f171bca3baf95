//! HTTP request handlers.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::ACCEPT_LANGUAGE},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;

use currency_types::{
    AppError, ConversionData, ConvertParams, CurrencyRateSource, ErrorResponse, FailResponse,
    Locale, SuccessResponse,
};

use super::metrics::ConvertMetrics;
use crate::ConversionService;

/// Application state shared across handlers.
pub struct AppState<S: CurrencyRateSource> {
    pub service: ConversionService<S>,
    pub default_locale: Locale,
    pub metrics: ConvertMetrics,
    pub openapi: utoipa::openapi::OpenApi,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::BadRequest(message) => {
                tracing::warn!("Invalid request: {}", message);
                (StatusCode::BAD_REQUEST, Json(FailResponse::new(message))).into_response()
            }
            AppError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(FailResponse::new(message))).into_response()
            }
            AppError::Upstream { message, data } => {
                tracing::warn!("{}", message);
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (
                    status,
                    Json(ErrorResponse::new(message, status.as_u16(), data)),
                )
                    .into_response()
            }
            AppError::Internal(message) => {
                tracing::error!("Unexpected error: {}", message);
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (
                    status,
                    Json(ErrorResponse::new(message, status.as_u16(), None)),
                )
                    .into_response()
            }
        }
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// OpenAPI document of the service.
pub async fn openapi<S: CurrencyRateSource>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    Json(state.openapi.clone())
}

/// Convert an amount between currencies.
///
/// The result is formatted for the first supported locale in
/// `Accept-Language`, else the configured default.
#[tracing::instrument(skip(state, headers))]
pub async fn convert<S: CurrencyRateSource>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(params): Query<ConvertParams>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let locale = headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(Locale::from_accept_language)
        .unwrap_or(state.default_locale);

    let outcome = run_conversion(&state.service, &params, locale).await;
    state.metrics.record(started.elapsed(), outcome.is_ok());

    let result = outcome?;
    Ok(Json(SuccessResponse::new(ConversionData { result })))
}

async fn run_conversion<S: CurrencyRateSource>(
    service: &ConversionService<S>,
    params: &ConvertParams,
    locale: Locale,
) -> Result<String, AppError> {
    let value = parse_value(params.value.as_deref())?;
    let result = service
        .convert(
            params.source.as_deref(),
            params.target.as_deref(),
            value,
            locale,
        )
        .await?;
    Ok(result)
}

/// Parses the `value` parameter as a plain or scientific decimal.
fn parse_value(raw: Option<&str>) -> Result<Decimal, AppError> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(AppError::BadRequest("Missing parameter: value".into())),
    };

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| AppError::BadRequest(format!("Invalid value: {}", raw)))
}
