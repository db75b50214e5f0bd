// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math.  Rolling columns are returned as
// `Vec<Option<f64>>` aligned with the input, and scalar readings as
// `Option<f64>`, so "not enough history" is always explicit and never shows
// up downstream as NaN.

pub mod change;
pub mod rsi;
pub mod sma;

use serde::Serialize;

use crate::config::IndicatorParams;
use crate::market_data::PriceSeries;

/// Flat record of the scalar indicators for the latest bar of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    /// Latest close.
    pub price: f64,
    /// % change of the latest close vs the previous close.
    pub chg: Option<f64>,
    /// % distance of the latest close below the highest high in the series.
    pub ath_dist: Option<f64>,
    pub rsi: Option<f64>,
    /// Long-window simple moving average.
    pub sma: Option<f64>,
    /// Lowest low of the trailing support window.
    pub range_low: Option<f64>,
}

impl IndicatorSnapshot {
    /// Derive the snapshot from a series whose columns are already attached.
    ///
    /// Returns `None` for an empty series.
    pub fn compute(series: &PriceSeries, params: &IndicatorParams) -> Option<Self> {
        let bars = series.bars();
        let last = bars.last()?;
        let price = last.close;

        let chg = bars
            .len()
            .checked_sub(2)
            .map(|i| change::pct_change(price, bars[i].close));

        let ath = bars
            .iter()
            .map(|b| b.high)
            .filter(|h| h.is_finite())
            .reduce(f64::max);
        let ath_dist = ath.map(|ath| change::ath_distance(price, ath));

        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let range_low = change::trailing_min(&lows, params.support_range_days);

        Some(Self {
            price,
            chg,
            ath_dist,
            rsi: series.rsi().last().copied().flatten(),
            sma: series.sma().last().copied().flatten(),
            range_low,
        })
    }

    /// `true` when the latest close is above the long moving average.
    /// `None` while the moving average is undefined.
    pub fn is_above_sma(&self) -> Option<bool> {
        self.sma.map(|sma| self.price > sma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::price_series::test_support::bars_from_closes;

    fn params(sma: usize, rsi: usize, support: usize) -> IndicatorParams {
        IndicatorParams {
            sma_period: sma,
            rsi_period: rsi,
            support_range_days: support,
            ..IndicatorParams::default()
        }
    }

    #[test]
    fn empty_series_has_no_snapshot() {
        let p = IndicatorParams::default();
        let series = PriceSeries::new(Vec::new(), &p);
        assert!(IndicatorSnapshot::compute(&series, &p).is_none());
    }

    #[test]
    fn short_series_leaves_rolling_indicators_undefined() {
        let p = IndicatorParams::default();
        let series = PriceSeries::new(bars_from_closes(&[100.0, 101.0, 99.0]), &p);
        let snap = IndicatorSnapshot::compute(&series, &p).unwrap();
        assert_eq!(snap.price, 99.0);
        assert!(snap.chg.is_some());
        assert!(snap.rsi.is_none());
        assert!(snap.sma.is_none());
        assert!(snap.range_low.is_none());
        assert!(snap.is_above_sma().is_none());
    }

    #[test]
    fn single_bar_has_no_change() {
        let p = IndicatorParams::default();
        let series = PriceSeries::new(bars_from_closes(&[42.0]), &p);
        let snap = IndicatorSnapshot::compute(&series, &p).unwrap();
        assert!(snap.chg.is_none());
        assert_eq!(snap.price, 42.0);
    }

    #[test]
    fn change_and_ath_distance() {
        let p = params(2, 2, 2);
        let series = PriceSeries::new(bars_from_closes(&[100.0, 200.0, 150.0]), &p);
        let snap = IndicatorSnapshot::compute(&series, &p).unwrap();
        assert!((snap.chg.unwrap() + 25.0).abs() < 1e-12);
        // Highs are close + 1 in the test fixture => peak 201.
        let expected = (150.0 - 201.0) / 201.0 * 100.0;
        assert!((snap.ath_dist.unwrap() - expected).abs() < 1e-12);
        assert_eq!(snap.sma, Some(175.0));
        // Lows are close - 1.
        assert_eq!(snap.range_low, Some(149.0));
        assert_eq!(snap.is_above_sma(), Some(false));
    }

    #[test]
    fn flat_800_bar_series_end_to_end() {
        let p = IndicatorParams::default();
        let series = PriceSeries::new(bars_from_closes(&vec![100.0; 800]), &p);

        for (i, value) in series.sma().iter().enumerate() {
            if i < 729 {
                assert!(value.is_none(), "SMA defined too early at {i}");
            } else {
                assert_eq!(*value, Some(100.0), "SMA at {i}");
            }
        }
        for value in &series.rsi()[729..] {
            let rsi = value.unwrap();
            assert!((rsi - 100.0).abs() < 1e-6, "RSI {rsi}");
        }

        let snap = IndicatorSnapshot::compute(&series, &p).unwrap();
        assert_eq!(snap.sma, Some(100.0));
        assert_eq!(snap.chg, Some(0.0));
        assert_eq!(snap.range_low, Some(99.0));
        // Flat close is not strictly above its own average.
        assert_eq!(snap.is_above_sma(), Some(false));
    }
}
