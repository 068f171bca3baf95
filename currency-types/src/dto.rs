//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! Responses follow the JSend convention: `success` carries `data`, `fail`
//! reports a client-side problem, `error` reports a server-side one.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ─────────────────────────────────────────────────────────────────────────────
// Request DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters of the convert endpoint.
///
/// Fields are optional so that missing parameters are reported in the JSend
/// envelope instead of a bare extractor rejection.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConvertParams {
    /// Currency to convert from (three-letter code)
    #[param(example = "USD")]
    pub source: Option<String>,
    /// Currency to convert to (three-letter code)
    #[param(example = "EUR")]
    pub target: Option<String>,
    /// Value to convert, as a decimal number
    #[param(example = "100")]
    pub value: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// JSend Response DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Fail,
    Error,
}

/// Payload of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversionData {
    /// Converted value as a localized currency string
    #[schema(example = "€85.00")]
    pub result: String,
}

/// JSend `success` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse<T> {
    pub status: ResponseStatus,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            data,
        }
    }
}

/// JSend `fail` envelope (client error).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FailResponse {
    pub status: ResponseStatus,
    #[schema(example = "Currency code not supported: GBP")]
    pub message: String,
}

impl FailResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Fail,
            message: message.into(),
        }
    }
}

/// JSend `error` envelope (server error).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 500)]
    pub code: Option<u16>,
    /// Error body returned by the rate provider, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: u16, data: Option<serde_json::Value>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            code: Some(code),
            data,
        }
    }
}
