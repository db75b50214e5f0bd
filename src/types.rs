// =============================================================================
// Shared types used across the briefing pipeline
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// `true` when the bar closed at or above its open.
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// Latest price and day-over-day change for one peer instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
}

impl Snapshot {
    /// Placeholder used when a lookup fails, so the report always has a row.
    pub fn sentinel(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: 0.0,
            change_pct: 0.0,
        }
    }
}

/// A news item reduced to its title and (possibly shortened) link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub title: String,
    pub link: String,
}

/// Crypto Fear & Greed index reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FearGreedReading {
    /// 0 (extreme fear) ..= 100 (extreme greed).
    pub value: u8,
    pub classification: String,
}

/// Response body of `GET /briefing`.
///
/// An empty `imagen_base64` is a valid state: the report is text-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingResult {
    pub mensaje: String,
    pub imagen_base64: String,
}

impl BriefingResult {
    pub fn text_only(mensaje: impl Into<String>) -> Self {
        Self {
            mensaje: mensaje.into(),
            imagen_base64: String::new(),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.imagen_base64.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_snapshot_is_zeroed() {
        let s = Snapshot::sentinel("Ethereum");
        assert_eq!(s.name, "Ethereum");
        assert_eq!(s.price, 0.0);
        assert_eq!(s.change_pct, 0.0);
    }

    #[test]
    fn briefing_result_serialises_with_wire_names() {
        let r = BriefingResult::text_only("hola");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["mensaje"], "hola");
        assert_eq!(json["imagen_base64"], "");
        assert!(!r.has_image());
    }
}
