//! Data size conversions

use crate::error::CoreError;

const SI_PREFIXES: [&str; 11] = ["", "k", "M", "G", "T", "P", "E", "Z", "Y", "R", "Q"];

fn unit_multiplier(unit: &str) -> Option<f64> {
    let multiplier = match unit {
        "B" | "byte" | "bytes" => 1.0,
        "kB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        "PB" => 1e15,
        "EB" => 1e18,
        "ZB" => 1e21,
        "YB" => 1e24,
        "kiB" | "KiB" => 1024f64,
        "MiB" => 1024f64.powi(2),
        "GiB" => 1024f64.powi(3),
        "TiB" => 1024f64.powi(4),
        "PiB" => 1024f64.powi(5),
        "EiB" => 1024f64.powi(6),
        "ZiB" => 1024f64.powi(7),
        "YiB" => 1024f64.powi(8),
        _ => return None,
    };
    Some(multiplier)
}

/// Convert a human-readable size such as `"1.2 MB"` into bytes
///
/// # Errors
/// Returns [`CoreError::InvalidSize`] unless the input is exactly a number
/// and a unit, and [`CoreError::UnknownUnit`] for unrecognised units.
pub fn human_to_bytes(size: &str) -> Result<u64, CoreError> {
    let mut parts = size.split_whitespace();
    let (Some(number), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CoreError::InvalidSize(size.to_string()));
    };

    let number: f64 = number
        .parse()
        .map_err(|_| CoreError::InvalidSize(size.to_string()))?;
    if !number.is_finite() || number < 0.0 {
        return Err(CoreError::InvalidSize(size.to_string()));
    }
    let multiplier = unit_multiplier(unit).ok_or_else(|| CoreError::UnknownUnit(unit.to_string()))?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = (number * multiplier) as u64;
    Ok(bytes)
}

/// Convert bytes into a rounded size with a metric prefix, e.g. `"12 MB"`
#[must_use]
pub fn bytes_to_human_si(size: u64) -> String {
    let digits = size.to_string().len();
    let power = (digits - 1) / 3;
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    let value = (size as f64 / 1000f64.powi(power as i32)).round_ties_even();
    format!("{value} {}B", SI_PREFIXES[power])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_to_bytes_si_and_iec() {
        assert_eq!(human_to_bytes("1.5 kB").unwrap(), 1500);
        assert_eq!(human_to_bytes("2 MiB").unwrap(), 2 * 1024 * 1024);
        assert_eq!(human_to_bytes("42 bytes").unwrap(), 42);
        assert_eq!(human_to_bytes("1.2 GB").unwrap(), 1_200_000_000);
    }

    #[test]
    fn test_human_to_bytes_non_breaking_space() {
        assert_eq!(human_to_bytes("3.0\u{a0}MB").unwrap(), 3_000_000);
    }

    #[test]
    fn test_human_to_bytes_rejects_garbage() {
        assert!(matches!(human_to_bytes(""), Err(CoreError::InvalidSize(_))));
        assert!(matches!(human_to_bytes("12"), Err(CoreError::InvalidSize(_))));
        assert!(matches!(
            human_to_bytes("x MB"),
            Err(CoreError::InvalidSize(_))
        ));
        assert!(matches!(
            human_to_bytes("12 parsecs"),
            Err(CoreError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_bytes_to_human_si() {
        assert_eq!(bytes_to_human_si(0), "0 B");
        assert_eq!(bytes_to_human_si(999), "999 B");
        assert_eq!(bytes_to_human_si(1_000), "1 kB");
        assert_eq!(bytes_to_human_si(12_345_678), "12 MB");
        assert_eq!(bytes_to_human_si(2_500_000_000), "2 GB");
    }
}
