//! Localized currency formatting.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};

use super::currency::CurrencyCode;

const NBSP: char = '\u{a0}';
const NARROW_NBSP: char = '\u{202f}';
const MINUS_SIGN: char = '\u{2212}';

/// Locales the service can format amounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    EnUs,
    EnGb,
    FiFi,
    SvSe,
    DeDe,
    FrFr,
    EsEs,
}

struct Style {
    decimal: char,
    group: char,
    minus: char,
    symbol_first: bool,
}

impl Locale {
    pub fn all() -> &'static [Locale] {
        &[
            Locale::EnUs,
            Locale::EnGb,
            Locale::FiFi,
            Locale::SvSe,
            Locale::DeDe,
            Locale::FrFr,
            Locale::EsEs,
        ]
    }

    /// BCP 47 tag of this locale.
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
            Locale::FiFi => "fi-FI",
            Locale::SvSe => "sv-SE",
            Locale::DeDe => "de-DE",
            Locale::FrFr => "fr-FR",
            Locale::EsEs => "es-ES",
        }
    }

    /// Resolves a language tag such as `fi`, `en-GB` or `de_AT`.
    ///
    /// A known language with an unknown region resolves to that language's
    /// default locale.
    pub fn from_tag(tag: &str) -> Option<Locale> {
        let tag = tag.trim().to_ascii_lowercase().replace('_', "-");
        let mut parts = tag.split('-');
        let language = parts.next()?;
        let region = parts.next();

        match (language, region) {
            ("en", Some("gb" | "uk" | "ie")) => Some(Locale::EnGb),
            ("en", _) => Some(Locale::EnUs),
            ("fi", _) => Some(Locale::FiFi),
            ("sv", _) => Some(Locale::SvSe),
            ("de", _) => Some(Locale::DeDe),
            ("fr", _) => Some(Locale::FrFr),
            ("es", _) => Some(Locale::EsEs),
            _ => None,
        }
    }

    /// Picks the best supported locale from an `Accept-Language` header value.
    ///
    /// Entries are ranked by their `q` weight (default 1.0); ties keep header
    /// order. Returns `None` when nothing in the header is supported.
    pub fn from_accept_language(header: &str) -> Option<Locale> {
        let mut ranges: Vec<(&str, f32)> = header
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let tag = parts.next()?.trim();
                let quality = parts
                    .find_map(|param| param.trim().strip_prefix("q="))
                    .map(|q| q.trim().parse::<f32>().unwrap_or(0.0))
                    .unwrap_or(1.0);
                (!tag.is_empty() && tag != "*" && quality > 0.0).then_some((tag, quality))
            })
            .collect();

        ranges.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranges.into_iter().find_map(|(tag, _)| Locale::from_tag(tag))
    }

    fn style(&self) -> Style {
        match self {
            Locale::EnUs | Locale::EnGb => Style {
                decimal: '.',
                group: ',',
                minus: '-',
                symbol_first: true,
            },
            Locale::FiFi | Locale::SvSe => Style {
                decimal: ',',
                group: NBSP,
                minus: MINUS_SIGN,
                symbol_first: false,
            },
            Locale::DeDe | Locale::EsEs => Style {
                decimal: ',',
                group: '.',
                minus: '-',
                symbol_first: false,
            },
            Locale::FrFr => Style {
                decimal: ',',
                group: NARROW_NBSP,
                minus: '-',
                symbol_first: false,
            },
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_tag(s).ok_or_else(|| format!("Unsupported locale: {}", s))
    }
}

/// Number of minor-unit digits for an ISO 4217 code.
pub fn minor_digits(code: &CurrencyCode) -> u32 {
    match code.as_str() {
        "BIF" | "CLP" | "DJF" | "GNF" | "ISK" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF" | "UGX"
        | "VND" | "VUV" | "XAF" | "XOF" | "XPF" => 0,
        "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
        _ => 2,
    }
}

/// Display symbol for a currency; falls back to the code itself.
pub fn currency_symbol(code: &CurrencyCode) -> &str {
    match code.as_str() {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "INR" => "₹",
        "KRW" => "₩",
        "ILS" => "₪",
        "VND" => "₫",
        other => other,
    }
}

/// Formats `amount` as a currency string for `code` in `locale`.
///
/// The amount is rounded half-even to the currency's minor digits.
pub fn format_currency(amount: Decimal, code: &CurrencyCode, locale: Locale) -> String {
    let style = locale.style();
    let digits = minor_digits(code);
    let rounded = amount.round_dp_with_strategy(digits, RoundingStrategy::MidpointNearestEven);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let plain = format!("{:.*}", digits as usize, rounded.abs());
    let (integer, fraction) = match plain.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (plain.as_str(), None),
    };

    let mut number = group_thousands(integer, style.group);
    if let Some(fraction) = fraction {
        number.push(style.decimal);
        number.push_str(fraction);
    }

    let symbol = currency_symbol(code);
    let mut out = String::new();
    if negative {
        out.push(style.minus);
    }
    if style.symbol_first {
        out.push_str(symbol);
        // Alphabetic symbols (plain codes) need a gap before the digits.
        if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
            out.push(NBSP);
        }
        out.push_str(&number);
    } else {
        out.push_str(&number);
        out.push(NBSP);
        out.push_str(symbol);
    }
    out
}

fn group_thousands(integer: &str, separator: char) -> String {
    let len = integer.len();
    let mut grouped = String::with_capacity(len + len / 3 * separator.len_utf8());
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(raw: &str) -> CurrencyCode {
        CurrencyCode::parse(raw).unwrap()
    }

    #[test]
    fn test_format_en_us() {
        assert_eq!(format_currency(dec!(85), &code("EUR"), Locale::EnUs), "€85.00");
        assert_eq!(
            format_currency(dec!(1234567.891), &code("USD"), Locale::EnUs),
            "$1,234,567.89"
        );
    }

    #[test]
    fn test_format_zero_and_negative() {
        assert_eq!(format_currency(dec!(0), &code("EUR"), Locale::EnUs), "€0.00");
        assert_eq!(format_currency(dec!(-85), &code("EUR"), Locale::EnUs), "-€85.00");
        assert_eq!(format_currency(dec!(-0.001), &code("EUR"), Locale::EnUs), "€0.00");
    }

    #[test]
    fn test_format_finnish() {
        assert_eq!(
            format_currency(dec!(85), &code("EUR"), Locale::FiFi),
            "85,00\u{a0}€"
        );
        assert_eq!(
            format_currency(dec!(-1234.5), &code("EUR"), Locale::FiFi),
            "\u{2212}1\u{a0}234,50\u{a0}€"
        );
    }

    #[test]
    fn test_format_german_grouping() {
        assert_eq!(
            format_currency(dec!(1234567.5), &code("EUR"), Locale::DeDe),
            "1.234.567,50\u{a0}€"
        );
    }

    #[test]
    fn test_format_code_symbol_gets_space() {
        assert_eq!(
            format_currency(dec!(10), &code("CHF"), Locale::EnUs),
            "CHF\u{a0}10.00"
        );
    }

    #[test]
    fn test_format_minor_digits() {
        assert_eq!(format_currency(dec!(1234.5), &code("JPY"), Locale::EnUs), "¥1,234");
        assert_eq!(format_currency(dec!(1.23456), &code("KWD"), Locale::EnUs), "KWD\u{a0}1.235");
    }

    #[test]
    fn test_format_rounds_half_even() {
        assert_eq!(format_currency(dec!(0.125), &code("USD"), Locale::EnUs), "$0.12");
        assert_eq!(format_currency(dec!(0.135), &code("USD"), Locale::EnUs), "$0.14");
    }

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(Locale::from_tag("fi"), Some(Locale::FiFi));
        assert_eq!(Locale::from_tag("en_GB"), Some(Locale::EnGb));
        assert_eq!(Locale::from_tag("en-AU"), Some(Locale::EnUs));
        assert_eq!(Locale::from_tag("de-AT"), Some(Locale::DeDe));
        assert_eq!(Locale::from_tag("ja-JP"), None);
        assert_eq!("fr-FR".parse::<Locale>(), Ok(Locale::FrFr));
        assert!("xx".parse::<Locale>().is_err());
    }

    #[test]
    fn test_locale_from_accept_language() {
        assert_eq!(
            Locale::from_accept_language("fi-FI,fi;q=0.9,en;q=0.8"),
            Some(Locale::FiFi)
        );
        assert_eq!(
            Locale::from_accept_language("ja;q=1.0, de;q=0.5, en;q=0.7"),
            Some(Locale::EnUs)
        );
        assert_eq!(Locale::from_accept_language("*"), None);
        assert_eq!(Locale::from_accept_language("ja, zh"), None);
        assert_eq!(Locale::from_accept_language("fi;q=0, sv"), Some(Locale::SvSe));
    }

    #[test]
    fn test_locale_tags_round_trip() {
        for locale in Locale::all() {
            assert_eq!(Locale::from_tag(locale.tag()), Some(*locale));
        }
    }
}
