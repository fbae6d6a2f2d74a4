//! Pure value parsers for table cells and labelled text.
//!
//! Every parser distinguishes an *empty* cell (a placeholder such as `-` or
//! `n/a`, which simply leaves the field absent) from an *invalid* one (text
//! that should have been a value but could not be read, which the field
//! extractor turns into a warning).

use crate::types::{DateValue, Vocabulary};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Characters dropped before numeric parsing: thousands separators,
/// whitespace and currency symbols.
static NUMERIC_NOISE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s$€£¥₹_']").unwrap());

/// Leading ringgit code, as in `RM 1,250` or `MYR1.5K`.
static RINGGIT_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:rm|myr)\s*").unwrap());

/// Strings authors use for "no value".
const PLACEHOLDERS: &[&str] = &["", "-", "--", "—", "–", "n/a", "na", "nil", "null", "none", "tbc", "tbd"];

/// Accepted range for parsed years; anything else is treated as a mismatch
/// so that later formats get a chance.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Outcome of parsing one raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// The value was read successfully.
    Value(T),
    /// The cell held nothing meaningful.
    Empty,
    /// The cell held text that could not be read as this kind of value.
    Invalid,
}

impl<T> Parsed<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Parsed::Value(v) => Some(v),
            Parsed::Empty | Parsed::Invalid => None,
        }
    }
}

/// A number as written on the slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Integer count; fractional values are rounded to the nearest unit.
    pub fn as_count(&self) -> Option<i64> {
        match *self {
            Number::Int(i) => Some(i),
            Number::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                Some(f.round() as i64)
            }
            Number::Float(_) => None,
        }
    }
}

/// Whether a raw cell is a "no value" placeholder.
pub fn is_placeholder(raw: &str) -> bool {
    let trimmed = raw.trim().to_lowercase();
    PLACEHOLDERS.contains(&trimmed.as_str())
}

/// Parse a numeric cell.
///
/// Accepts thousands separators, currency symbols or a leading `RM`/`MYR`
/// code, a trailing percent sign
/// and K/M/B magnitude suffixes (`"1.2K"` → `1200`). Dots used as grouping
/// separators (`"1.234.567"`) are also understood.
pub fn parse_number(raw: &str) -> Parsed<Number> {
    if is_placeholder(raw) {
        return Parsed::Empty;
    }

    let unprefixed = RINGGIT_PREFIX_REGEX.replace(raw.trim(), "");
    let mut s = NUMERIC_NOISE_REGEX.replace_all(&unprefixed, "").into_owned();
    let mut is_percent = false;
    if let Some(stripped) = s.strip_suffix('%') {
        s = stripped.to_string();
        is_percent = true;
    }

    let mut multiplier = 1.0;
    if let Some(last) = s.chars().last() {
        let factor = match last.to_ascii_uppercase() {
            'K' => Some(1_000.0),
            'M' => Some(1_000_000.0),
            'B' => Some(1_000_000_000.0),
            _ => None,
        };
        if let Some(factor) = factor {
            s.pop();
            multiplier = factor;
        }
    }

    if s.is_empty() {
        return Parsed::Invalid;
    }

    if s.matches('.').count() > 1 {
        s = s.replace('.', "");
    }

    if multiplier == 1.0 && !is_percent && !s.contains(['.', 'e', 'E']) {
        return match s.parse::<i64>() {
            Ok(i) => Parsed::Value(Number::Int(i)),
            Err(_) => Parsed::Invalid,
        };
    }

    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => {
            let scaled = f * multiplier;
            let rounded = scaled.round();
            // 1.2 * 1000 may land a hair off 1200.
            if multiplier > 1.0 && (scaled - rounded).abs() < 1e-6 && rounded.abs() < i64::MAX as f64 {
                Parsed::Value(Number::Int(rounded as i64))
            } else {
                Parsed::Value(Number::Float(scaled))
            }
        }
        _ => Parsed::Invalid,
    }
}

/// Parse a date cell, trying `formats` (strftime syntax) in order.
///
/// The raw text is kept even when no format matches; the validator reports
/// such dates.
pub fn parse_date(raw: &str, formats: &[String]) -> Parsed<DateValue> {
    if is_placeholder(raw) {
        return Parsed::Empty;
    }

    let text = crate::normalize::clean_text(raw);
    let parsed = formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&text, fmt)
            .ok()
            .filter(|d| YEAR_RANGE.contains(&d.year()))
    });

    Parsed::Value(DateValue { raw: text, parsed })
}

/// Parse an enumerated cell. Unrecognized text maps to the vocabulary's
/// unknown variant rather than failing.
pub fn parse_enum<T: Vocabulary>(raw: &str) -> Parsed<T> {
    if is_placeholder(raw) {
        return Parsed::Empty;
    }
    Parsed::Value(T::lookup(raw))
}

/// Split a list cell on `delimiter`, trimming items and dropping empty ones.
pub fn parse_list(raw: &str, delimiter: &str) -> Parsed<Vec<String>> {
    if is_placeholder(raw) {
        return Parsed::Empty;
    }
    let items: Vec<String> = if delimiter.is_empty() {
        vec![raw.trim().to_string()]
    } else {
        raw.split(delimiter)
            .map(|item| item.trim())
            .filter(|item| !item.is_empty() && !is_placeholder(item))
            .map(str::to_string)
            .collect()
    };
    if items.is_empty() {
        Parsed::Empty
    } else {
        Parsed::Value(items)
    }
}

/// Parse a free-text cell.
pub fn parse_text(raw: &str) -> Parsed<String> {
    if is_placeholder(raw) {
        return Parsed::Empty;
    }
    Parsed::Value(crate::normalize::clean_text(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KolTier;

    fn formats() -> Vec<String> {
        ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%d %b %Y"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_parse_plain_and_grouped_integers() {
        assert_eq!(parse_number("1000"), Parsed::Value(Number::Int(1000)));
        assert_eq!(parse_number(" 41,607 "), Parsed::Value(Number::Int(41607)));
        assert_eq!(parse_number("1 234"), Parsed::Value(Number::Int(1234)));
        assert_eq!(parse_number("1.234.567"), Parsed::Value(Number::Int(1234567)));
        assert_eq!(parse_number("-12"), Parsed::Value(Number::Int(-12)));
    }

    #[test]
    fn test_parse_suffixes_percent_and_currency() {
        assert_eq!(parse_number("1.2K"), Parsed::Value(Number::Int(1200)));
        assert_eq!(parse_number("3m"), Parsed::Value(Number::Int(3_000_000)));
        assert_eq!(parse_number("5%"), Parsed::Value(Number::Float(5.0)));
        assert_eq!(parse_number("RM"), Parsed::Invalid);
        assert_eq!(parse_number("$1,250.50"), Parsed::Value(Number::Float(1250.5)));
    }

    #[test]
    fn test_parse_ringgit_amounts() {
        assert_eq!(parse_number("RM 1,250"), Parsed::Value(Number::Int(1250)));
        assert_eq!(parse_number("rm1,250.50"), Parsed::Value(Number::Float(1250.5)));
        assert_eq!(parse_number("MYR 3,000"), Parsed::Value(Number::Int(3000)));
        assert_eq!(parse_number("myr1.5k"), Parsed::Value(Number::Int(1500)));
        assert_eq!(parse_number("RM -"), Parsed::Invalid);
    }

    #[test]
    fn test_parse_number_placeholders_and_garbage() {
        assert_eq!(parse_number(""), Parsed::Empty);
        assert_eq!(parse_number(" N/A "), Parsed::Empty);
        assert_eq!(parse_number("--"), Parsed::Empty);
        assert_eq!(parse_number("lots"), Parsed::Invalid);
        assert_eq!(parse_number("12abc"), Parsed::Invalid);
    }

    #[test]
    fn test_number_as_count() {
        assert_eq!(Number::Float(2.6).as_count(), Some(3));
        assert_eq!(Number::Int(7).as_count(), Some(7));
        assert_eq!(Number::Float(f64::NAN).as_count(), None);
    }

    #[test]
    fn test_parse_date_first_matching_format_wins() {
        let d = parse_date("3/1/2024", &formats()).value().unwrap();
        assert_eq!(d.raw, "3/1/2024");
        assert_eq!(d.parsed, NaiveDate::from_ymd_opt(2024, 3, 1));

        let d = parse_date("3/1/24", &formats()).value().unwrap();
        assert_eq!(d.parsed, NaiveDate::from_ymd_opt(2024, 3, 1));

        let d = parse_date("12 Mar 2024", &formats()).value().unwrap();
        assert_eq!(d.parsed, NaiveDate::from_ymd_opt(2024, 3, 12));
    }

    #[test]
    fn test_parse_date_keeps_unparsable_text() {
        let d = parse_date("sometime in March", &formats()).value().unwrap();
        assert_eq!(d.raw, "sometime in March");
        assert_eq!(d.parsed, None);
        assert_eq!(parse_date("-", &formats()), Parsed::Empty);
    }

    #[test]
    fn test_parse_enum_defaults_to_unknown() {
        assert_eq!(parse_enum::<KolTier>("Macro"), Parsed::Value(KolTier::Macro));
        assert_eq!(parse_enum::<KolTier>("celebrity"), Parsed::Value(KolTier::Unknown));
        assert_eq!(parse_enum::<KolTier>(""), Parsed::Empty);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list("#ramadan, #promo ,, ", ","),
            Parsed::Value(vec!["#ramadan".to_string(), "#promo".to_string()])
        );
        assert_eq!(parse_list("n/a", ","), Parsed::Empty);
    }
}
