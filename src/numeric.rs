//! Locale-aware conversion of spreadsheet text into numbers.
//!
//! Exports mix `1.234,56` (es) and `1,234.56` (en) styles, prefix or suffix
//! currency markers and write negatives in parentheses. [`to_number`] never
//! fails: missing or unreadable amounts in a statement count as zero.
//!
//! Known ambiguity: a single comma followed by at most two digits is read as a
//! decimal comma, so an integer such as `1,50` written with a thousands comma
//! would be misread. This is kept deliberately; see DESIGN.md.

use once_cell::sync::Lazy;
use regex::Regex;

static CURRENCY_CODES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(USD|EUR|GBP|MXN|COP|ARS|CLP|PEN|BRL|US\$|R\$|S/\.?|Bs\.?)").unwrap()
});

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₡', '₲', '₱'];

/// Parses `raw` into a number, or `None` when the text is not a number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let stripped = CURRENCY_CODES.replace_all(raw, "");
    let mut body: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c) && *c != '\u{a0}')
        .collect();

    if let Some(rest) = body.strip_suffix('%') {
        body = rest.to_string();
    }

    let mut negative = false;
    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = inner.to_string();
    }
    if let Some(rest) = body.strip_prefix('-') {
        negative = !negative;
        body = rest.to_string();
    } else if let Some(rest) = body.strip_suffix('-') {
        negative = !negative;
        body = rest.to_string();
    } else if let Some(rest) = body.strip_prefix('+') {
        body = rest.to_string();
    }

    if body.is_empty()
        || !body.chars().any(|c| c.is_ascii_digit())
        || !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.')
    {
        return None;
    }

    let canonical = normalize_separators(&body)?;
    let value: f64 = canonical.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Converts `raw` into a number, returning 0 for anything unparsable.
pub fn to_number(raw: &str) -> f64 {
    parse_number(raw).unwrap_or(0.0)
}

fn normalize_separators(body: &str) -> Option<String> {
    let last_comma = body.rfind(',');
    let last_period = body.rfind('.');

    let canonical = match (last_comma, last_period) {
        (Some(comma), Some(period)) => {
            // The rightmost separator is the decimal marker.
            let (decimal, thousands) = if comma > period { (',', '.') } else { ('.', ',') };
            let without_thousands: String = body.chars().filter(|c| *c != thousands).collect();
            if without_thousands.matches(decimal).count() > 1 {
                return None;
            }
            without_thousands.replace(decimal, ".")
        }
        (Some(comma), None) => {
            let digits_after = body.len() - comma - 1;
            if body.matches(',').count() == 1 && (1..=2).contains(&digits_after) {
                body.replace(',', ".")
            } else {
                body.replace(',', "")
            }
        }
        (None, Some(_)) => {
            if body.matches('.').count() > 1 {
                body.replace('.', "")
            } else {
                body.to_string()
            }
        }
        (None, None) => body.to_string(),
    };

    Some(canonical)
}
