//! CIP (Classification of Instructional Programs) code handling.

use crate::parser::integral_text;

/// Width of a normalized CIP code.
pub const CIP_WIDTH: usize = 6;

/// Normalizes a raw CIP code into a fixed-width, zero-padded digit string.
///
/// A float-rendered integer code (`"420101.0"`) loses its `.0` first. Dots
/// are then removed and the result is left-padded with zeros to
/// [`CIP_WIDTH`]. Missing or blank input yields `None`. Normalizing an
/// already-normalized code returns it unchanged.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stripped: String = integral_text(trimmed).chars().filter(|c| *c != '.').collect();
    Some(format!("{:0>width$}", stripped, width = CIP_WIDTH))
}

/// Derives the two-digit series prefix from a normalized code.
///
/// The code is read as an integer, rendered with at least four digits, and
/// the first two characters are kept. Codes that are not integers have no
/// prefix.
pub fn series_prefix(code: &str) -> Option<String> {
    let value: u64 = code.trim().parse().ok()?;
    let rendered = format!("{value:04}");
    Some(rendered[..2].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_dots_and_pads() {
        assert_eq!(normalize(Some("1.0100")).as_deref(), Some("010100"));
        assert_eq!(normalize(Some("11.07")).as_deref(), Some("001107"));
        assert_eq!(normalize(Some("5203")).as_deref(), Some("005203"));
    }

    #[test]
    fn test_normalize_equivalent_spellings() {
        assert_eq!(normalize(Some("1.0100")), normalize(Some("010100")));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["1.0100", "5203", "26.0101", "000101"] {
            let once = normalize(Some(raw)).unwrap();
            let twice = normalize(Some(&once)).unwrap();
            assert_eq!(once, twice);
            assert_eq!(once.len(), CIP_WIDTH);
        }
    }

    #[test]
    fn test_normalize_float_rendered_codes() {
        assert_eq!(normalize(Some("420101.0")).as_deref(), Some("420101"));
        assert_eq!(normalize(Some("4201.0")).as_deref(), Some("004201"));
        assert_eq!(normalize(Some("4201.0")), normalize(Some("4201")));

        for raw in ["420101.0", "4201.0", "5203", "1.0100", "42.01", " 11.07 "] {
            assert_eq!(normalize(Some(raw)).unwrap().len(), CIP_WIDTH, "{raw}");
        }
    }

    #[test]
    fn test_normalize_missing() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("  ")), None);
    }

    #[test]
    fn test_series_prefix() {
        assert_eq!(series_prefix("005203").as_deref(), Some("52"));
        assert_eq!(series_prefix("001101").as_deref(), Some("11"));
        assert_eq!(series_prefix("000101").as_deref(), Some("01"));
        assert_eq!(series_prefix("abc"), None);
    }
}
