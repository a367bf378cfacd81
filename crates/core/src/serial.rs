//! Serial number allocation.
//!
//! Serials are derived from whatever records the caller currently has loaded, not from a
//! server-side counter: the next serial is the largest numeric serial seen plus one. Two
//! sessions allocating from the same stale snapshot can therefore hand out the same serial.

use crate::constants::{MORTALITY_SERIAL_PREFIX, SERIAL_WIDTH};
use crate::record::{Collection, PatientRecord};

/// Serial format for a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerialScheme {
    /// Plain zero-padded numbers: `001`, `002`, ...
    Census,
    /// Prefixed numbers: `M-001`, `M-002`, ...
    Mortality,
}

impl SerialScheme {
    pub fn for_collection(collection: Collection) -> Self {
        match collection {
            Collection::Census => SerialScheme::Census,
            Collection::Mortality => SerialScheme::Mortality,
        }
    }

    /// Numeric value of a serial under this scheme, if it has one.
    ///
    /// Census serials take the leading run of digits (`"12"`, `" 7"`, `"12b"` all parse);
    /// mortality serials take the first run of digits anywhere (`"M-004"` is 4).
    pub fn numeric_value(self, serial: &str) -> Option<u64> {
        let digits = match self {
            SerialScheme::Census => {
                let s = serial.trim_start();
                let s = s.strip_prefix('+').unwrap_or(s);
                leading_digits(s)
            }
            SerialScheme::Mortality => {
                let start = serial.find(|c: char| c.is_ascii_digit())?;
                leading_digits(&serial[start..])
            }
        };
        if digits.is_empty() {
            return None;
        }
        digits.parse().ok()
    }

    /// Renders `value` in this scheme.
    pub fn format(self, value: u64) -> String {
        match self {
            SerialScheme::Census => format!("{value:0width$}", width = SERIAL_WIDTH),
            SerialScheme::Mortality => format!(
                "{MORTALITY_SERIAL_PREFIX}{value:0width$}",
                width = SERIAL_WIDTH
            ),
        }
    }
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    &s[..end]
}

/// Next serial after the given existing serials.
///
/// Serials without a numeric value are ignored. With no numeric serials at all the
/// first serial (`001` / `M-001`) is returned.
pub fn next_serial<'a, I>(scheme: SerialScheme, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|serial| scheme.numeric_value(serial))
        .max()
        .unwrap_or(0);
    scheme.format(max.saturating_add(1))
}

/// Next serial for a loaded set of records.
pub fn next_serial_for(scheme: SerialScheme, records: &[PatientRecord]) -> String {
    next_serial(scheme, records.iter().map(|r| r.serial_number.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_starts_at_one() {
        let none: [&str; 0] = [];
        assert_eq!(next_serial(SerialScheme::Census, none), "001");
        assert_eq!(next_serial(SerialScheme::Mortality, none), "M-001");
    }

    #[test]
    fn test_next_after_maximum() {
        assert_eq!(next_serial(SerialScheme::Census, ["003", "001", "007"]), "008");
    }

    #[test]
    fn test_non_numeric_serials_are_ignored() {
        assert_eq!(next_serial(SerialScheme::Census, ["", "abc", "002"]), "003");
        assert_eq!(next_serial(SerialScheme::Census, ["n/a", ""]), "001");
    }

    #[test]
    fn test_census_parses_leading_digits_only() {
        assert_eq!(SerialScheme::Census.numeric_value("12b"), Some(12));
        assert_eq!(SerialScheme::Census.numeric_value("  9"), Some(9));
        assert_eq!(SerialScheme::Census.numeric_value("M-004"), None);
    }

    #[test]
    fn test_mortality_extracts_embedded_number() {
        assert_eq!(SerialScheme::Mortality.numeric_value("M-004"), Some(4));
        assert_eq!(SerialScheme::Mortality.numeric_value("012"), Some(12));
        assert_eq!(SerialScheme::Mortality.numeric_value("M-"), None);
        assert_eq!(
            next_serial(SerialScheme::Mortality, ["M-001", "M-010", "004"]),
            "M-011"
        );
    }

    #[test]
    fn test_width_grows_past_three_digits() {
        assert_eq!(next_serial(SerialScheme::Census, ["999"]), "1000");
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let existing = ["005", "002"];
        assert_eq!(
            next_serial(SerialScheme::Census, existing),
            next_serial(SerialScheme::Census, existing)
        );
    }
}
