//! # Currency Types
//!
//! Domain types and port traits for the currency conversion service.
//! This crate has no IO dependencies - only data structures,
//! validation rules, formatting and trait definitions.
//!
//! ## Architecture
//!
//! This crate is the innermost core of the hexagonal architecture:
//! - `domain/` - Currency codes, rates and localized formatting
//! - `ports/` - Traits the rate adapters must implement
//! - `dto/` - JSend response envelopes and request parameters
//! - `error/` - Rate, conversion and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Conversion, CurrencyCode, CurrencyRate, Locale, RatePair, SupportedCurrencies, format_currency,
};
pub use dto::*;
pub use error::{AppError, ConversionError, RateError};
pub use ports::{CurrencyRateSource, RateProvider};
