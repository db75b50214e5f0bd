// =============================================================================
// Fear & Greed Index — crowd sentiment reading for the crypto market
// =============================================================================
//
//   GET https://api.alternative.me/fng/
//   { "data": [ { "value": "45", "value_classification": "Fear", .. } ] }
//
// Purely informational: a failed lookup just drops the line from the report.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::market_data::history::coerce_f64;
use crate::types::FearGreedReading;

#[derive(Clone)]
pub struct FearGreedClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl FearGreedClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    /// `None` when the lookup is disabled (empty URL).
    pub fn from_config(client: reqwest::Client, config: &AppConfig) -> Option<Self> {
        if config.api.fear_greed_url.is_empty() {
            return None;
        }
        Some(Self::new(
            client,
            config.api.fear_greed_url.clone(),
            config.api.fear_greed_timeout(),
        ))
    }

    /// Latest reading, or `None` on any failure.
    pub async fn reading(&self) -> Option<FearGreedReading> {
        match self.fetch().await {
            Ok(reading) => {
                debug!(value = reading.value, class = %reading.classification, "fear & greed fetched");
                Some(reading)
            }
            Err(e) => {
                warn!(error = %e, "fear & greed lookup failed");
                None
            }
        }
    }

    pub async fn fetch(&self) -> Result<FearGreedReading, FetchError> {
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
            .map_err(|e| FetchError::malformed(format!("fear & greed body is not JSON: {e}")))?;

        parse_fng(&body)
    }
}

pub fn parse_fng(body: &Value) -> Result<FearGreedReading, FetchError> {
    let entry = body["data"]
        .as_array()
        .ok_or_else(|| FetchError::malformed("missing data array"))?
        .first()
        .ok_or(FetchError::Empty)?;

    let value = coerce_f64(&entry["value"])
        .filter(|v| (0.0..=100.0).contains(v))
        .ok_or_else(|| FetchError::malformed("value missing or outside 0..=100"))?;
    let classification = entry["value_classification"]
        .as_str()
        .unwrap_or("")
        .to_string();

    Ok(FearGreedReading {
        value: value.round() as u8,
        classification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parse_string_value() {
        let body = json!({ "name": "Fear and Greed Index", "data": [ { "value": "45", "value_classification": "Fear", "timestamp": "1700000000" } ] });
        let r = parse_fng(&body).unwrap();
        assert_eq!(r.value, 45);
        assert_eq!(r.classification, "Fear");
    }

    #[test]
    fn parse_rejects_out_of_range_and_empty() {
        assert!(parse_fng(&json!({ "data": [ { "value": "140" } ] })).is_err());
        assert!(matches!(parse_fng(&json!({ "data": [] })), Err(FetchError::Empty)));
        assert!(matches!(parse_fng(&json!({})), Err(FetchError::Malformed(_))));
    }

    #[tokio::test]
    async fn reading_is_none_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = FearGreedClient::new(reqwest::Client::new(), server.uri(), Duration::from_secs(2));
        assert!(client.reading().await.is_none());
    }

    #[tokio::test]
    async fn reading_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [ { "value": 72, "value_classification": "Greed" } ] })))
            .mount(&server)
            .await;

        let client = FearGreedClient::new(reqwest::Client::new(), server.uri(), Duration::from_secs(2));
        let r = client.reading().await.unwrap();
        assert_eq!(r.value, 72);
        assert_eq!(r.classification, "Greed");
    }

    #[test]
    fn disabled_when_url_empty() {
        let mut cfg = AppConfig::default();
        cfg.api.fear_greed_url.clear();
        assert!(FearGreedClient::from_config(reqwest::Client::new(), &cfg).is_none());
    }
}
