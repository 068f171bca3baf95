//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    http::{
        HeaderValue,
        header::{CACHE_CONTROL, CONTENT_SECURITY_POLICY},
    },
    middleware,
    routing::get,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use currency_types::{CurrencyRateSource, Locale};

use super::auth::{ApiKeyAuth, auth_middleware};
use super::handlers::{self, AppState};
use super::metrics::ConvertMetrics;
use crate::ConversionService;

/// Settings of the HTTP surface.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// First path segment of the API routes.
    pub service_name: String,
    /// Key clients must send in `X-API-KEY`.
    pub api_key: String,
    /// Locale used when `Accept-Language` names none we support.
    pub default_locale: Locale,
}

/// HTTP Server for the Currency API.
pub struct HttpServer<S: CurrencyRateSource> {
    state: Arc<AppState<S>>,
    auth: Arc<ApiKeyAuth>,
    service_name: String,
}

impl<S: CurrencyRateSource> HttpServer<S> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: ConversionService<S>, settings: ServerSettings) -> Self {
        let service_name = settings.service_name.trim_matches('/').to_string();
        Self {
            state: Arc::new(AppState {
                service,
                default_locale: settings.default_locale,
                metrics: ConvertMetrics::new(),
                openapi: crate::openapi::document(&service_name),
            }),
            auth: Arc::new(ApiKeyAuth::new(settings.api_key)),
            service_name,
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route(
                &format!("/{}/convert", self.service_name),
                get(handlers::convert::<S>),
            )
            .route(
                &format!("/{}/openapi.json", self.service_name),
                get(handlers::openapi::<S>),
            )
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.auth.clone(),
                auth_middleware,
            ))
            .layer(SetResponseHeaderLayer::overriding(
                CONTENT_SECURITY_POLICY,
                HeaderValue::from_static("default-src 'self'"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(
            service = %self.service_name,
            "Server listening on {}",
            listener.local_addr()?
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
