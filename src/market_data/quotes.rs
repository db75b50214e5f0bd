// =============================================================================
// Peer Quote Client — latest price and previous close per instrument
// =============================================================================
//
// Uses the Yahoo-style chart endpoint:
//
//   GET {base}/v8/finance/chart/{symbol}?range=1d&interval=1d
//   { "chart": { "result": [ { "meta": { "regularMarketPrice": ..,
//                                         "previousClose": ..,
//                                         "chartPreviousClose": .. } } ],
//                "error": null } }
//
// `chartPreviousClose` is the close before the first bar of the requested
// range, so the range must stay at one session for it to mean "yesterday".
// `previousClose` wins when present.
//
// Each instrument is looked up on its own; a failure for one symbol is
// logged and replaced by a zeroed snapshot so the batch always returns one
// entry per configured instrument, in configuration order.
// =============================================================================

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{AppConfig, PeerInstrument};
use crate::error::FetchError;
use crate::indicators::change::pct_change;
use crate::market_data::history::coerce_f64;
use crate::types::Snapshot;

/// Last traded price and the previous session's close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub last_price: f64,
    pub previous_close: f64,
}

impl Quote {
    pub fn change_pct(&self) -> f64 {
        pct_change(self.last_price, self.previous_close)
    }
}

#[derive(Clone)]
pub struct QuoteClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl QuoteClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &AppConfig) -> Self {
        Self::new(
            client,
            config.api.quote_base_url.clone(),
            config.api.quote_timeout(),
        )
    }

    /// Snapshot every peer sequentially. Never fails; always returns exactly
    /// `peers.len()` entries in the same order.
    #[instrument(skip_all, name = "quotes::snapshots", fields(count = peers.len()))]
    pub async fn snapshots(&self, peers: &[PeerInstrument]) -> Vec<Snapshot> {
        let mut out = Vec::with_capacity(peers.len());
        for peer in peers {
            let snapshot = match self.fetch_quote(&peer.symbol).await {
                Ok(quote) => Snapshot {
                    name: peer.name.clone(),
                    price: quote.last_price,
                    change_pct: quote.change_pct(),
                },
                Err(e) => {
                    warn!(symbol = %peer.symbol, name = %peer.name, error = %e, "peer quote failed, using zero sentinel");
                    Snapshot::sentinel(peer.name.clone())
                }
            };
            out.push(snapshot);
        }
        out
    }

    /// Fetch the quote for a single `symbol`.
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let url = self.chart_url(symbol)?;

        let resp = self
            .client
            .get(url)
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
            .map_err(|e| FetchError::malformed(format!("quote body is not JSON: {e}")))?;

        let quote = parse_chart_meta(&body)?;
        debug!(symbol, price = quote.last_price, prev = quote.previous_close, "quote fetched");
        Ok(quote)
    }

    fn chart_url(&self, symbol: &str) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| FetchError::malformed(format!("bad quote base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::malformed("quote base url cannot be a base"))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("range", "1d")
            .append_pair("interval", "1d");
        Ok(url)
    }
}

/// Extract price and previous close from a chart payload.
pub fn parse_chart_meta(body: &Value) -> Result<Quote, FetchError> {
    let chart = &body["chart"];
    if let Some(err) = chart["error"].as_object() {
        let description = err
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(FetchError::Upstream(description.to_string()));
    }

    let meta = &chart["result"][0]["meta"];
    if meta.is_null() {
        return Err(FetchError::Empty);
    }

    let last_price = coerce_f64(&meta["regularMarketPrice"])
        .ok_or_else(|| FetchError::malformed("missing regularMarketPrice"))?;
    let previous_close = coerce_f64(&meta["previousClose"])
        .or_else(|| coerce_f64(&meta["chartPreviousClose"]))
        .ok_or_else(|| FetchError::malformed("missing previous close"))?;

    Ok(Quote {
        last_price,
        previous_close,
    })
}
