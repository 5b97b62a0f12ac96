//! Parsers for the irregular value encodings found in Scorecard-style reports.
//!
//! Two flavors are provided:
//!
//! - [`coerce`] is a strict numeric coercion. Anything that is not a plain
//!   finite number becomes `None`.
//! - [`parse_encoded`] understands the repayment-component encodings: plain
//!   numbers, ranges (`"0.1-0.2"`), comparisons (`"<=0.05"`) and privacy
//!   suppression sentinels.
//!
//! Neither ever fails; malformed input degrades to absence.

/// Result of parsing an encoded repayment-component cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoded {
    Number(f64),
    Absent,
}

impl Encoded {
    pub fn value(self) -> Option<f64> {
        match self {
            Encoded::Number(v) => Some(v),
            Encoded::Absent => None,
        }
    }
}

const SUPPRESSED: &[&str] = &["PS", "PrivacySuppressed", "NULL", "NA", "NaN"];

/// Coerces a raw cell into a finite `f64`.
pub fn coerce(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses an encoded repayment-component value.
///
/// Ranges resolve to their midpoint. Comparisons resolve to the stated bound
/// with the inequality dropped, which is an approximation rather than a bound.
pub fn parse_encoded(raw: Option<&str>) -> Encoded {
    let Some(raw) = raw else {
        return Encoded::Absent;
    };
    let s = raw.trim();
    if s.is_empty() || SUPPRESSED.contains(&s) {
        return Encoded::Absent;
    }

    let parsed = if let Some(rest) = s.strip_prefix("<=").or_else(|| s.strip_prefix(">=")) {
        number(rest)
    } else if let Some(rest) = s.strip_prefix('<').or_else(|| s.strip_prefix('>')) {
        number(rest)
    } else if let Some(v) = number(s) {
        Some(v)
    } else if let Some((lo, hi)) = split_range(s) {
        match (number(lo), number(hi)) {
            (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
            _ => None,
        }
    } else {
        None
    };

    match parsed {
        Some(v) => Encoded::Number(v),
        None => Encoded::Absent,
    }
}

/// Drops the `.0` a float round-trip appends to an integer code, so
/// `"420101.0"` reads as `"420101"`. Anything else is returned unchanged.
pub fn integral_text(s: &str) -> &str {
    match s.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit()) => int,
        _ => s,
    }
}

fn number(s: &str) -> Option<f64> {
    coerce(Some(s))
}

/// Splits `"A-B"` on the first dash that is not a leading sign.
/// Anything with more than one separating dash is not a range.
fn split_range(s: &str) -> Option<(&str, &str)> {
    let offset = usize::from(s.starts_with('-'));
    let idx = s[offset..].find('-')? + offset;
    let (lo, hi) = (&s[..idx], &s[idx + 1..]);
    let hi_body = hi.trim_start().strip_prefix('-').unwrap_or(hi.trim_start());
    if hi_body.contains('-') {
        return None;
    }
    Some((lo, hi))
}
