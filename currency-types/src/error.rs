//! Error types for the currency conversion service.

/// Failures of the upstream rate provider or of the resilience layer in
/// front of it.
///
/// `Clone` so that every caller waiting on one in-flight upstream call can
/// receive the same error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateError {
    #[error("Could not get a valid response from external currency rate API: {message}")]
    Upstream {
        message: String,
        /// HTTP status returned by the provider, if a response was received.
        status: Option<u16>,
        /// Raw response body of a non-success response.
        body: Option<String>,
    },

    #[error("External currency rate API returned an empty response for {0}")]
    NullResult(String),

    #[error("External currency rate API is unavailable: circuit breaker is open")]
    CircuitOpen,
}

impl RateError {
    /// Upstream failure without an HTTP response (transport error, bad payload).
    pub fn upstream(message: impl Into<String>) -> Self {
        RateError::Upstream {
            message: message.into(),
            status: None,
            body: None,
        }
    }
}

/// Conversion-level errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    /// Malformed or unsupported currency code. Never retried.
    #[error("{0}")]
    InvalidCurrency(String),

    #[error(transparent)]
    Rate(#[from] RateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{message}")]
    Upstream {
        message: String,
        /// Upstream error body, when it was valid JSON.
        data: Option<serde_json::Value>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::InvalidCurrency(msg) => AppError::BadRequest(msg),
            ConversionError::Rate(e) => {
                let data = match &e {
                    RateError::Upstream {
                        body: Some(body), ..
                    } => serde_json::from_str(body).ok(),
                    _ => None,
                };
                AppError::Upstream {
                    message: e.to_string(),
                    data,
                }
            }
            ConversionError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_currency_maps_to_bad_request() {
        let err: AppError = ConversionError::InvalidCurrency("Currency code not supported: GBP".into())
            .into();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("GBP")));
    }

    #[test]
    fn test_upstream_json_body_becomes_data() {
        let err: AppError = ConversionError::Rate(RateError::Upstream {
            message: "HTTP 401".into(),
            status: Some(401),
            body: Some(r#"{"error":"invalid api key"}"#.into()),
        })
        .into();

        match err {
            AppError::Upstream { message, data } => {
                assert!(message.contains("HTTP 401"));
                assert_eq!(data.unwrap()["error"], "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upstream_non_json_body_has_no_data() {
        let err: AppError = ConversionError::Rate(RateError::Upstream {
            message: "HTTP 502".into(),
            status: Some(502),
            body: Some("<html>Bad Gateway</html>".into()),
        })
        .into();

        assert!(matches!(err, AppError::Upstream { data: None, .. }));
    }

    #[test]
    fn test_circuit_open_maps_to_upstream() {
        let err: AppError = ConversionError::from(RateError::CircuitOpen).into();
        assert!(matches!(err, AppError::Upstream { data: None, .. }));
    }
}
