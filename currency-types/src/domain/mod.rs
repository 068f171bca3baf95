//! Domain models for the currency conversion service.

pub mod currency;
pub mod format;
pub mod rate;

pub use currency::{CurrencyCode, SupportedCurrencies};
pub use format::{Locale, format_currency};
pub use rate::{Conversion, CurrencyRate, RatePair};
