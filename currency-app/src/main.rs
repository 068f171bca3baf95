//! # Currency Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Build the rate API client and the resilient rate service
//! - Start the cache evictor
//! - Start the HTTP server

mod config;

use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use currency_hex::{
    ConversionService,
    inbound::HttpServer,
    resilience::{CacheEvictor, ResilientRateService},
};
use rates_client::RatesApiClient;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("currency-service"), provider))
}

fn init_meter() -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .build();

    global::set_meter_provider(provider.clone());
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing and metrics
    let (otel_tracer, otel_provider) = init_tracer()?;
    let meter_provider = init_meter()?;
    let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "info,currency_app=debug,currency_hex=debug,rates_client=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!(
        "Starting {} on port {}",
        config.server.service_name,
        config.port
    );
    tracing::info!("Using currency rate API: {}", config.rates_api.base_url);
    if config.resilience.supported_currencies_fallback.is_some() {
        tracing::info!("Supported currencies fallback is enabled");
    }

    // Build the upstream client and wrap it with caching and resilience
    let client = RatesApiClient::new(&config.rates_api.base_url, &config.rates_api.api_key)
        .with_timeout(config.rates_api.timeout);
    let rates = ResilientRateService::new(client, config.resilience.clone());
    let evictor = CacheEvictor::start(&rates, config.eviction);

    // Create and run the HTTP server
    let service = ConversionService::new(rates);
    let server = HttpServer::new(service, config.server.clone());
    let addr = format!("0.0.0.0:{}", config.port);

    let served = server.run(&addr).await;

    evictor.shutdown().await;

    // Ensure traces and metrics are flushed before exit
    let _ = meter_provider.shutdown();
    let _ = otel_provider.shutdown();
    served
}
