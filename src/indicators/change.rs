// =============================================================================
// Price change, drawdown from peak, and support range
// =============================================================================

/// Percentage change from `previous` to `current`.
///
/// Returns 0.0 when `previous` is zero or either input is non-finite, so a
/// bad quote never turns into an infinite or NaN percentage.
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Percent distance of `price` below the peak `ath` (zero or negative).
pub fn ath_distance(price: f64, ath: f64) -> f64 {
    pct_change(price, ath)
}

/// Minimum of the trailing `window` values, `None` if fewer are available.
pub fn trailing_min(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    values[values.len() - window..]
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_change_basic() {
        assert!((pct_change(110.0, 100.0) - 10.0).abs() < 1e-12);
        assert!((pct_change(90.0, 100.0) + 10.0).abs() < 1e-12);
    }

    #[test]
    fn pct_change_zero_denominator_is_zero() {
        assert_eq!(pct_change(123.0, 0.0), 0.0);
        assert_eq!(pct_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn pct_change_non_finite_is_zero() {
        assert_eq!(pct_change(f64::NAN, 10.0), 0.0);
        assert_eq!(pct_change(10.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn ath_distance_is_non_positive_below_peak() {
        assert!((ath_distance(75.0, 100.0) + 25.0).abs() < 1e-12);
        assert_eq!(ath_distance(100.0, 100.0), 0.0);
        assert_eq!(ath_distance(100.0, 0.0), 0.0);
    }

    #[test]
    fn trailing_min_requires_full_window() {
        assert_eq!(trailing_min(&[3.0, 1.0], 3), None);
        assert_eq!(trailing_min(&[5.0, 3.0, 4.0, 2.0, 6.0], 3), Some(2.0));
        assert_eq!(trailing_min(&[1.0, 9.0, 8.0, 7.0], 3), Some(7.0));
        assert_eq!(trailing_min(&[1.0], 0), None);
    }
}
