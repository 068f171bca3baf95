//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use currency_types::dto::{
    ConversionData, ConvertParams, ErrorResponse, FailResponse, ResponseStatus, SuccessResponse,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::inbound::API_KEY_HEADER;

/// Service name the documented convert path is written with.
const DOCUMENTED_SERVICE: &str = "currency-api";

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Convert an amount between two currencies
///
/// The result is formatted for the first supported locale in the
/// `Accept-Language` header, falling back to the configured default.
#[utoipa::path(
    get,
    path = "/currency-api/convert",
    tag = "conversion",
    params(ConvertParams),
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Converted and formatted amount", body = SuccessResponse<ConversionData>,
            example = json!({"status": "success", "data": {"result": "€85.00"}})),
        (status = 400, description = "Missing value or invalid/unsupported currency code", body = FailResponse),
        (status = 401, description = "Missing or invalid API key", body = FailResponse),
        (status = 500, description = "Rate provider unavailable or returned an error", body = ErrorResponse)
    )
)]
async fn convert() {}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Currency API",
        description = "Converts amounts between currencies using rates from an external provider",
        license(name = "MIT"),
    ),
    paths(health, convert),
    components(schemas(ConversionData, FailResponse, ErrorResponse, ResponseStatus)),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "conversion", description = "Currency conversion"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for the API key header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

/// Builds the document with the convert path under `service_name`.
pub fn document(service_name: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let documented = format!("/{}/convert", DOCUMENTED_SERVICE);
    if service_name != DOCUMENTED_SERVICE {
        if let Some(item) = doc.paths.paths.remove(&documented) {
            doc.paths
                .paths
                .insert(format!("/{}/convert", service_name), item);
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = document("currency-api");
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/currency-api/convert"));
    }

    #[test]
    fn test_document_follows_service_name() {
        let doc = document("fx");
        assert!(doc.paths.paths.contains_key("/fx/convert"));
        assert!(!doc.paths.paths.contains_key("/currency-api/convert"));
    }

    #[test]
    fn test_document_declares_api_key_scheme() {
        let json = serde_json::to_value(document("currency-api")).unwrap();
        assert_eq!(
            json["components"]["securitySchemes"]["api_key"]["name"],
            API_KEY_HEADER
        );
    }
}
