//! Small numeric helpers

/// Rescale `x` from `[min_x, max_x]` into `[a, b]`
///
/// A degenerate input range maps everything onto the midpoint of `[a, b]`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn min_max_normalize(x: f64, min_x: f64, max_x: f64, a: f64, b: f64) -> f64 {
    if min_x == max_x {
        return (a + b) / 2.0;
    }
    a + (x - min_x) * (b - a) / (max_x - min_x)
}

/// Rescale every value of `values` from its own range into `[a, b]`
#[must_use]
pub fn normalize_all(values: &[f64], a: f64, b: f64) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values
        .iter()
        .map(|&x| min_max_normalize(x, min, max, a, b))
        .collect()
}

/// Constrain `x` into `[minimum, maximum]`
#[must_use]
pub fn clamp(x: f64, minimum: f64, maximum: f64) -> f64 {
    minimum.max(maximum.min(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_normalize() {
        assert!((min_max_normalize(5.0, 0.0, 10.0, 0.0, 1.0) - 0.5).abs() < 1e-12);
        assert!((min_max_normalize(10.0, 0.0, 10.0, 1.2, 3.0) - 3.0).abs() < 1e-12);
        assert!((min_max_normalize(7.0, 7.0, 7.0, 0.2, 2.0) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_all() {
        let scaled = normalize_all(&[2.0, 4.0, 6.0], 0.0, 10.0);
        assert_eq!(scaled, vec![0.0, 5.0, 10.0]);
        assert!(normalize_all(&[], 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-0.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.25, 0.0, 1.0), 0.25);
    }
}
