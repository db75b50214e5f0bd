// =============================================================================
// Relative Strength Index (RSI) — rolling simple averages
// =============================================================================
//
// RSI measures the balance between recent up-moves and down-moves.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Over the last `period` deltas, average the gains (positive deltas,
//          others clipped to 0) and the losses (negated negative deltas,
//          others clipped to 0).
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Zero loss: the loss average is replaced by `loss_epsilon` and the ratio
// saturates at 1/epsilon, so a run without any down move (flat runs
// included) reads as RSI = 100 / (1 + epsilon), i.e. just under 100.
//
// Thresholds:  RSI > 70 => overbought,  RSI < 30 => oversold.
// =============================================================================

/// Compute the RSI column for `closes`, aligned index-for-index.
///
/// Entry `i` is `Some` once `period` deltas are available (`i >= period`),
/// `None` before that.
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - `closes.len() <= period` => all `None`
/// - Non-finite results (NaN inputs) are reported as `None`.
pub fn rolling_rsi(closes: &[f64], period: usize, loss_epsilon: f64) -> Vec<Option<f64>> {
    let mut column = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return column;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    // deltas[j] is the move into close j + 1.
    for (end, slot) in column.iter_mut().enumerate().skip(period) {
        let window = &deltas[end - period..end];
        if window.iter().any(|d| !d.is_finite()) {
            continue;
        }
        let (sum_gain, sum_loss) = window.iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            (g + d.max(0.0), l + (-d).max(0.0))
        });
        *slot = rsi_from_averages(sum_gain / period_f, sum_loss / period_f, loss_epsilon);
    }

    column
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64, loss_epsilon: f64) -> Option<f64> {
    let rs = if avg_loss == 0.0 {
        1.0 / loss_epsilon
    } else {
        avg_gain / avg_loss
    };
    let rsi = 100.0 - 100.0 / (1.0 + rs);

    if rsi.is_finite() {
        Some(rsi)
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-10;

    fn current_rsi(closes: &[f64], period: usize, loss_epsilon: f64) -> Option<f64> {
        rolling_rsi(closes, period, loss_epsilon).last().copied().flatten()
    }

    #[test]
    fn rsi_empty_input() {
        assert!(rolling_rsi(&[], 14, EPS).is_empty());
        assert!(current_rsi(&[], 14, EPS).is_none());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(rolling_rsi(&[1.0, 2.0, 3.0], 0, EPS).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_fewer_bars_than_period_is_undefined() {
        for n in 0..=14 {
            let closes: Vec<f64> = (0..n).map(|x| 100.0 + x as f64).collect();
            assert!(current_rsi(&closes, 14, EPS).is_none(), "n = {n}");
        }
    }

    #[test]
    fn rsi_first_defined_index_is_period() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let column = rolling_rsi(&closes, 14, EPS);
        assert_eq!(column.len(), 20);
        assert!(column[13].is_none());
        assert!(column[14].is_some());
    }

    #[test]
    fn rsi_flat_market_saturates_near_100() {
        let closes = vec![100.0; 30];
        let value = current_rsi(&closes, 14, EPS).unwrap();
        assert!(value.is_finite());
        assert!((value - 100.0).abs() < 1e-6, "expected ~100, got {value}");
    }

    #[test]
    fn rsi_all_gains_is_near_100() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in rolling_rsi(&closes, 14, EPS).into_iter().flatten() {
            assert!((v - 100.0).abs() < 1e-6, "expected ~100, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in rolling_rsi(&closes, 14, EPS).into_iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_epsilon_is_configurable() {
        let closes = vec![50.0; 20];
        let coarse = current_rsi(&closes, 14, 0.01).unwrap();
        // 100 / (1 + 0.01)
        assert!((coarse - 99.00990099).abs() < 1e-6, "got {coarse}");
    }

    #[test]
    fn rsi_balanced_moves_is_50() {
        // Alternating +1 / -1 over an even period => equal averages.
        let closes: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let value = current_rsi(&closes, 14, EPS).unwrap();
        assert!((value - 50.0).abs() < 1e-10, "got {value}");
    }

    #[test]
    fn rsi_known_value() {
        // Last 3 deltas: +2, -1, +1 => gain 1.0, loss 1/3 => RS 3 => RSI 75.
        let closes = [10.0, 12.0, 11.0, 12.0];
        let value = current_rsi(&closes, 3, EPS).unwrap();
        assert!((value - 75.0).abs() < 1e-10, "got {value}");
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for v in rolling_rsi(&closes, 14, EPS).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_nan_input_is_undefined_not_nan() {
        let mut closes = vec![100.0; 20];
        closes[18] = f64::NAN;
        assert!(current_rsi(&closes, 14, EPS).is_none());
    }
}
