// =============================================================================
// Daily History Client — CryptoCompare `histoday` OHLCV series
// =============================================================================
//
// Payload shape:
//
//   { "Response": "Success",
//     "Data": { "Data": [ { "time": 1700000000, "open": .., "high": ..,
//                           "low": .., "close": .., "volumefrom": .. }, .. ] } }
//
// Numeric fields may arrive as numbers or numeric strings.  Anything that does
// not parse is treated as missing: a bar without time/open/high/low/close is
// dropped, a missing volume reads as zero.
// =============================================================================

use std::time::Duration;

use chrono::DateTime;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{AppConfig, IndicatorParams};
use crate::error::FetchError;
use crate::market_data::PriceSeries;
use crate::types::PriceBar;

/// Fetches the primary instrument's daily history.
#[derive(Clone)]
pub struct HistoryClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HistoryClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &AppConfig) -> Self {
        Self::new(client, config.api.series_url.clone(), config.api.series_timeout())
    }

    /// Fetch and normalise the series, attaching indicator columns.
    ///
    /// Failures are logged here and returned to the caller as `Err`.
    #[instrument(skip_all, name = "history::fetch_series")]
    pub async fn fetch_series(&self, params: &IndicatorParams) -> Result<PriceSeries, FetchError> {
        match self.fetch_bars().await {
            Ok(bars) => {
                let series = PriceSeries::new(bars, params);
                info!(bars = series.len(), "daily history fetched");
                Ok(series)
            }
            Err(e) => {
                warn!(error = %e, url = %self.url, "daily history fetch failed");
                Err(e)
            }
        }
    }

    async fn fetch_bars(&self) -> Result<Vec<PriceBar>, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| FetchError::malformed(format!("history body is not JSON: {e}")))?;

        parse_histoday(&body)
    }
}

/// Extract bars from a `histoday` payload.
pub fn parse_histoday(body: &Value) -> Result<Vec<PriceBar>, FetchError> {
    if body["Response"].as_str() == Some("Error") {
        let message = body["Message"].as_str().unwrap_or("unknown error");
        return Err(FetchError::Upstream(message.to_string()));
    }

    let rows = body["Data"]["Data"]
        .as_array()
        .ok_or_else(|| FetchError::malformed("missing Data.Data array"))?;

    let mut bars = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;
    for row in rows {
        match parse_row(row) {
            Some(bar) => bars.push(bar),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, kept = bars.len(), "history rows with missing fields dropped");
    }
    if bars.is_empty() {
        return Err(FetchError::Empty);
    }

    Ok(bars)
}

fn parse_row(row: &Value) -> Option<PriceBar> {
    let time = coerce_f64(&row["time"])?;
    let timestamp = DateTime::from_timestamp(time as i64, 0)?;
    Some(PriceBar {
        timestamp,
        open: coerce_f64(&row["open"])?,
        high: coerce_f64(&row["high"])?,
        low: coerce_f64(&row["low"])?,
        close: coerce_f64(&row["close"])?,
        volume: coerce_f64(&row["volumefrom"]).unwrap_or(0.0),
    })
}

/// Numbers pass through, numeric strings are parsed, everything else
/// (null, garbage, NaN/inf) is missing.
pub(crate) fn coerce_f64(val: &Value) -> Option<f64> {
    let parsed = match val {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_payload() -> Value {
        json!({
            "Response": "Success",
            "Data": {
                "Aggregated": false,
                "Data": [
                    { "time": 1700092800, "open": 36500.0, "high": 37900.0, "low": 36400.0, "close": 37800.0, "volumefrom": 41000.5 },
                    { "time": 1700006400, "open": "35500.5", "high": "36700", "low": "35300", "close": "36500.0", "volumefrom": "38000" },
                    { "time": 1700179200, "open": 37800.0, "high": 38100.0, "low": 37200.0, "close": null, "volumefrom": 1.0 },
                    { "time": 1700265600, "open": 37500.0, "high": 37600.0, "low": 36900.0, "close": 37000.0 }
                ]
            }
        })
    }

    #[test]
    fn parse_coerces_strings_and_drops_incomplete_rows() {
        let bars = parse_histoday(&sample_payload()).unwrap();
        assert_eq!(bars.len(), 3);
        assert!((bars[1].open - 35500.5).abs() < f64::EPSILON);
        assert!((bars[1].volume - 38000.0).abs() < f64::EPSILON);
        // Missing volume reads as zero.
        assert_eq!(bars[2].volume, 0.0);
    }

    #[test]
    fn parse_upstream_error_response() {
        let body = json!({ "Response": "Error", "Message": "rate limit", "Data": {} });
        assert!(matches!(parse_histoday(&body), Err(FetchError::Upstream(m)) if m == "rate limit"));
    }

    #[test]
    fn parse_missing_data_is_malformed() {
        let body = json!({ "Response": "Success" });
        assert!(matches!(parse_histoday(&body), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn parse_empty_rows_is_empty() {
        let body = json!({ "Response": "Success", "Data": { "Data": [] } });
        assert!(matches!(parse_histoday(&body), Err(FetchError::Empty)));
    }

    #[test]
    fn coerce_f64_variants() {
        assert_eq!(coerce_f64(&json!(1.5)), Some(1.5));
        assert_eq!(coerce_f64(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(coerce_f64(&json!("abc")), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_f64(&json!([1])), None);
    }

    #[tokio::test]
    async fn fetch_series_sorts_bars() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/v2/histoday"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_payload()))
            .mount(&server)
            .await;

        let client = HistoryClient::new(
            reqwest::Client::new(),
            format!("{}/data/v2/histoday", server.uri()),
            Duration::from_secs(2),
        );
        let series = client.fetch_series(&IndicatorParams::default()).await.unwrap();
        assert_eq!(series.len(), 3);
        let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![36500.0, 37800.0, 37000.0]);
    }

    #[tokio::test]
    async fn fetch_series_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HistoryClient::new(reqwest::Client::new(), server.uri(), Duration::from_secs(2));
        let err = client.fetch_series(&IndicatorParams::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500 }));
    }

    #[tokio::test]
    async fn fetch_series_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = HistoryClient::new(reqwest::Client::new(), server.uri(), Duration::from_secs(2));
        let err = client.fetch_series(&IndicatorParams::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn fetch_series_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_payload())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = HistoryClient::new(reqwest::Client::new(), server.uri(), Duration::from_millis(50));
        let err = client.fetch_series(&IndicatorParams::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
