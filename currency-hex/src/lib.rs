//! # Currency Hex
//!
//! Application service, resilient rate layer and HTTP adapter for the
//! currency API.
//!
//! ## Architecture
//!
//! - `service/` - Conversion service (validation, rate lookup, formatting)
//! - `resilience/` - Caching, retrying, circuit-broken `CurrencyRateSource`
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `S: CurrencyRateSource`; in production that
//! is a `ResilientRateService` wrapping the HTTP rate client.

pub mod inbound;
pub mod openapi;
pub mod resilience;
pub mod service;


pub use service::ConversionService;
