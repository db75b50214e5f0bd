use serde::Serialize;

use crate::config::IndicatorParams;
use crate::indicators::{rsi, sma};
use crate::types::PriceBar;

// ---------------------------------------------------------------------------
// PriceSeries -- ordered daily bars plus aligned indicator columns
// ---------------------------------------------------------------------------

/// Daily bars for one instrument, ascending by timestamp with no duplicate
/// timestamps, and the indicator columns derived from them.
///
/// Every column has exactly one entry per bar; an entry is `None` until its
/// rolling window is full.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
    sma: Vec<Option<f64>>,
    short_sma: Vec<Option<f64>>,
    rsi: Vec<Option<f64>>,
}

impl PriceSeries {
    /// Normalise `bars` (sort ascending, drop duplicate timestamps keeping the
    /// last occurrence) and attach the indicator columns.
    pub fn new(mut bars: Vec<PriceBar>, params: &IndicatorParams) -> Self {
        // Stable sort keeps arrival order among equal timestamps, so the
        // later duplicate is the one that survives the dedup below.
        bars.sort_by_key(|b| b.timestamp);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }

        let closes: Vec<f64> = deduped.iter().map(|b| b.close).collect();
        Self {
            sma: sma::rolling_sma(&closes, params.sma_period),
            short_sma: sma::rolling_sma(&closes, params.short_sma_period),
            rsi: rsi::rolling_rsi(&closes, params.rsi_period, params.rsi_loss_epsilon),
            bars: deduped,
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Long moving average column.
    pub fn sma(&self) -> &[Option<f64>] {
        &self.sma
    }

    /// Short moving average column (chart overlay).
    pub fn short_sma(&self) -> &[Option<f64>] {
        &self.short_sma
    }

    pub fn rsi(&self) -> &[Option<f64>] {
        &self.rsi
    }

    /// Index of the first bar in the trailing `count` bars.
    pub fn tail_start(&self, count: usize) -> usize {
        self.bars.len().saturating_sub(count)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};

    use crate::types::PriceBar;

    /// Daily bars starting 2024-01-01 with open = close, high = close + 1,
    /// low = close - 1.
    pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0,
            })
            .collect()
    }
}
