// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// The unweighted mean of the trailing `period` closes.  Each window is summed
// from scratch instead of with a running sum, so a constant series yields the
// constant exactly (no accumulated floating-point drift over long windows).

/// Compute the SMA column for `values`, aligned index-for-index.
///
/// Entry `i` is `Some` once `period` values are available
/// (`i >= period - 1`), `None` before that.
pub fn rolling_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut column = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return column;
    }

    let period_f = period as f64;
    for (i, window) in values.windows(period).enumerate() {
        let mean = window.iter().sum::<f64>() / period_f;
        column[i + period - 1] = mean.is_finite().then_some(mean);
    }

    column
}
