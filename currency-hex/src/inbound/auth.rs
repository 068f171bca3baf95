//! Authentication middleware for API key validation.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use currency_types::AppError;

use super::handlers::ApiError;

/// Header carrying the client's API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// The single API key accepted by the service.
pub struct ApiKeyAuth {
    api_key: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    fn verify(&self, presented: &str) -> bool {
        bool::from(presented.as_bytes().ct_eq(self.api_key.as_bytes()))
    }
}

/// Rejects requests without a valid `X-API-KEY` header.
///
/// `/health` bypasses authentication.
pub async fn auth_middleware(
    State(auth): State<Arc<ApiKeyAuth>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let valid = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| auth.verify(key));

    match valid {
        Some(true) => next.run(request).await,
        Some(false) => {
            tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
            unauthorized("Invalid API key")
        }
        None => unauthorized("Missing API key"),
    }
}

fn unauthorized(message: &str) -> Response {
    ApiError(AppError::Unauthorized(message.into())).into_response()
}
