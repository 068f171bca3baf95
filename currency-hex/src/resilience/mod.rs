//! Resilience layer in front of the rate provider.
//!
//! `ResilientRateService` wraps any `RateProvider` with single-flight
//! caching, bounded retries and a shared circuit breaker; `CacheEvictor`
//! expires its caches on fixed periods.

mod cache;
mod circuit_breaker;
mod evictor;
mod rate_service;
mod retry;

pub use cache::FlightCache;
pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use evictor::{CacheEvictor, EvictionSchedule};
pub use rate_service::{ResilienceConfig, ResilientRateService};
pub use retry::{ResilientCall, RetryPolicy};
