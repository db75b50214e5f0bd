// =============================================================================
// Application Configuration — loaded once at startup, immutable afterwards
// =============================================================================
//
// Every tunable of the briefing pipeline lives here: upstream endpoints, the
// peer instrument table, indicator windows and chart styling.  The struct is
// built once in `main`, validated, wrapped in an `Arc` and handed to each
// component explicitly.
//
// All fields carry `#[serde(default)]` so a partial JSON file (or none at all)
// still produces a complete configuration.
// =============================================================================

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_series_url() -> String {
    "https://min-api.cryptocompare.com/data/v2/histoday?fsym=BTC&tsym=USD&limit=800".to_string()
}

fn default_news_url() -> String {
    "https://news.google.com/rss/search?q=Bitcoin+OR+Criptomonedas+OR+Mercados&hl=es&gl=ES&ceid=ES:es"
        .to_string()
}

fn default_quote_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_shortener_url() -> String {
    "http://tinyurl.com/api-create.php?url={url}".to_string()
}

fn default_fear_greed_url() -> String {
    "https://api.alternative.me/fng/".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_series_timeout_secs() -> u64 {
    10
}

fn default_quote_timeout_secs() -> u64 {
    5
}

fn default_news_timeout_secs() -> u64 {
    5
}

fn default_shortener_timeout_secs() -> u64 {
    2
}

fn default_fear_greed_timeout_secs() -> u64 {
    5
}

fn default_sma_period() -> usize {
    730
}

fn default_rsi_period() -> usize {
    14
}

fn default_support_range_days() -> usize {
    60
}

fn default_plot_range_days() -> usize {
    150
}

fn default_short_sma_period() -> usize {
    20
}

fn default_rsi_loss_epsilon() -> f64 {
    1e-10
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_peers() -> Vec<PeerInstrument> {
    fn peer(
        symbol: &str,
        name: &str,
        label: &str,
        icon: &str,
        currency: &str,
        decimals: usize,
        show_change: bool,
    ) -> PeerInstrument {
        PeerInstrument {
            symbol: symbol.to_string(),
            name: name.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            currency: currency.to_string(),
            decimals,
            show_change,
        }
    }

    vec![
        peer("ETH-USD", "Ethereum", "ETH", "Ξ", "$", 0, true),
        peer("MSTR", "MicroStrategy", "MSTR", "🏢", "$", 2, true),
        peer("^GSPC", "S&P 500", "SP500", "🏛", "", 0, true),
        peer("^NDX", "Nasdaq 100", "NDX", "💻", "", 0, true),
        peer("GC=F", "Oro (Gold)", "ORO", "🥇", "$", 0, false),
    ]
}

// =============================================================================
// ApiConfig
// =============================================================================

/// Upstream endpoints and HTTP behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Daily OHLCV history of the primary instrument (CryptoCompare histoday).
    #[serde(default = "default_series_url")]
    pub series_url: String,

    /// RSS feed used for headlines.
    #[serde(default = "default_news_url")]
    pub news_url: String,

    /// Base URL of the chart/quote API used for peer snapshots.
    #[serde(default = "default_quote_base_url")]
    pub quote_base_url: String,

    /// URL shortener template; `{url}` is replaced by the encoded link.
    #[serde(default = "default_shortener_url")]
    pub shortener_url: String,

    /// Fear & Greed index endpoint. Empty string disables the lookup.
    #[serde(default = "default_fear_greed_url")]
    pub fear_greed_url: String,

    /// `User-Agent` sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_series_timeout_secs")]
    pub series_timeout_secs: u64,

    #[serde(default = "default_quote_timeout_secs")]
    pub quote_timeout_secs: u64,

    #[serde(default = "default_news_timeout_secs")]
    pub news_timeout_secs: u64,

    #[serde(default = "default_shortener_timeout_secs")]
    pub shortener_timeout_secs: u64,

    #[serde(default = "default_fear_greed_timeout_secs")]
    pub fear_greed_timeout_secs: u64,
}

impl ApiConfig {
    pub fn series_timeout(&self) -> Duration {
        Duration::from_secs(self.series_timeout_secs)
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }

    pub fn news_timeout(&self) -> Duration {
        Duration::from_secs(self.news_timeout_secs)
    }

    pub fn shortener_timeout(&self) -> Duration {
        Duration::from_secs(self.shortener_timeout_secs)
    }

    pub fn fear_greed_timeout(&self) -> Duration {
        Duration::from_secs(self.fear_greed_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            series_url: default_series_url(),
            news_url: default_news_url(),
            quote_base_url: default_quote_base_url(),
            shortener_url: default_shortener_url(),
            fear_greed_url: default_fear_greed_url(),
            user_agent: default_user_agent(),
            series_timeout_secs: default_series_timeout_secs(),
            quote_timeout_secs: default_quote_timeout_secs(),
            news_timeout_secs: default_news_timeout_secs(),
            shortener_timeout_secs: default_shortener_timeout_secs(),
            fear_greed_timeout_secs: default_fear_greed_timeout_secs(),
        }
    }
}

// =============================================================================
// Instruments
// =============================================================================

/// The instrument the briefing is about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryInstrument {
    /// Short ticker used in the report ("BTC").
    pub label: String,
    pub icon: String,
    /// Pair shown in the chart title ("BTC/USD").
    pub pair: String,
    /// Prefix for the primary instrument's prices.
    pub currency: String,
}

impl Default for PrimaryInstrument {
    fn default() -> Self {
        Self {
            label: "BTC".to_string(),
            icon: "₿".to_string(),
            pair: "BTC/USD".to_string(),
            currency: default_currency(),
        }
    }
}

/// A secondary instrument tracked for snapshot display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInstrument {
    /// Symbol understood by the quote provider (`^GSPC`, `GC=F`, ...).
    pub symbol: String,
    /// Display name; unique across the peer table.
    pub name: String,
    /// Short label printed in the report.
    pub label: String,
    #[serde(default)]
    pub icon: String,
    /// Prefix printed before the price. Empty for index points.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Decimal places for the price.
    #[serde(default)]
    pub decimals: usize,
    #[serde(default = "default_true")]
    pub show_change: bool,
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Window lengths (in bars) for the indicator engine and chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// Long simple moving average window.
    #[serde(default = "default_sma_period")]
    pub sma_period: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// Trailing window for the support (minimum low) level.
    #[serde(default = "default_support_range_days")]
    pub support_range_days: usize,

    /// Trailing window drawn on the chart.
    #[serde(default = "default_plot_range_days")]
    pub plot_range_days: usize,

    /// Short moving average drawn on the chart.
    #[serde(default = "default_short_sma_period")]
    pub short_sma_period: usize,

    /// Substituted for a zero RSI loss average.
    #[serde(default = "default_rsi_loss_epsilon")]
    pub rsi_loss_epsilon: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_period: default_sma_period(),
            rsi_period: default_rsi_period(),
            support_range_days: default_support_range_days(),
            plot_range_days: default_plot_range_days(),
            short_sma_period: default_short_sma_period(),
            rsi_loss_epsilon: default_rsi_loss_epsilon(),
        }
    }
}

// =============================================================================
// ChartStyle
// =============================================================================

/// Chart dimensions and palette. Colors are `#rrggbb` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub text_color: String,
    pub grid_color: String,
    pub show_grid: bool,
    pub up_color: String,
    pub down_color: String,
    pub sma_color: String,
    pub support_color: String,
    pub short_sma_color: String,
    pub legend_background: String,
    /// TrueType fonts tried in order for chart text.
    pub font_paths: Vec<String>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            background: "#0a0a14".to_string(),
            text_color: "#e6e6e6".to_string(),
            grid_color: "#2c2c3a".to_string(),
            show_grid: true,
            up_color: "#00ff00".to_string(),
            down_color: "#ff3333".to_string(),
            sma_color: "#ffa500".to_string(),
            support_color: "#00ffff".to_string(),
            short_sma_color: "#ffffff".to_string(),
            legend_background: "#333333".to_string(),
            font_paths: vec![
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string(),
                "/usr/share/fonts/dejavu/DejaVuSans.ttf".to_string(),
                "/usr/share/fonts/TTF/DejaVuSans.ttf".to_string(),
                "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf".to_string(),
                "/System/Library/Fonts/Supplemental/Arial.ttf".to_string(),
                "C:\\Windows\\Fonts\\arial.ttf".to_string(),
            ],
        }
    }
}

impl ChartStyle {
    fn colors(&self) -> [(&'static str, &str); 9] {
        [
            ("background", &self.background),
            ("text_color", &self.text_color),
            ("grid_color", &self.grid_color),
            ("up_color", &self.up_color),
            ("down_color", &self.down_color),
            ("sma_color", &self.sma_color),
            ("support_color", &self.support_color),
            ("short_sma_color", &self.short_sma_color),
            ("legend_background", &self.legend_background),
        ]
    }
}

/// Parse a `#rrggbb` color.
pub fn parse_hex_color(s: &str) -> Result<(u8, u8, u8)> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("invalid color '{s}', expected #rrggbb");
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level configuration for the briefing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub primary: PrimaryInstrument,

    /// Peer instruments in report order.
    #[serde(default = "default_peers")]
    pub peers: Vec<PeerInstrument>,

    #[serde(default)]
    pub params: IndicatorParams,

    #[serde(default)]
    pub chart: ChartStyle,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            primary: PrimaryInstrument::default(),
            peers: default_peers(),
            params: IndicatorParams::default(),
            chart: ChartStyle::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            peers = config.peers.len(),
            sma_period = config.params.sma_period,
            "config loaded"
        );

        Ok(config)
    }

    /// Check every field that could otherwise fail deep inside a request.
    pub fn validate(&self) -> Result<()> {
        let p = &self.params;
        for (name, value) in [
            ("sma_period", p.sma_period),
            ("rsi_period", p.rsi_period),
            ("support_range_days", p.support_range_days),
            ("plot_range_days", p.plot_range_days),
            ("short_sma_period", p.short_sma_period),
        ] {
            if value == 0 {
                bail!("params.{name} must be greater than zero");
            }
        }
        if !(p.rsi_loss_epsilon.is_finite() && p.rsi_loss_epsilon > 0.0) {
            bail!("params.rsi_loss_epsilon must be a positive finite number");
        }

        let api = &self.api;
        for (name, url) in [
            ("series_url", &api.series_url),
            ("news_url", &api.news_url),
            ("quote_base_url", &api.quote_base_url),
        ] {
            reqwest::Url::parse(url).with_context(|| format!("api.{name} is not a valid URL"))?;
        }
        if !api.fear_greed_url.is_empty() {
            reqwest::Url::parse(&api.fear_greed_url)
                .context("api.fear_greed_url is not a valid URL")?;
        }
        if !api.shortener_url.contains("{url}") {
            bail!("api.shortener_url must contain a {{url}} placeholder");
        }

        let mut names = HashSet::new();
        for peer in &self.peers {
            if peer.symbol.trim().is_empty() {
                bail!("peer '{}' has an empty symbol", peer.name);
            }
            if !names.insert(peer.name.as_str()) {
                bail!("duplicate peer name '{}'", peer.name);
            }
        }

        let chart = &self.chart;
        if chart.width < 200 || chart.height < 200 {
            bail!("chart must be at least 200x200 pixels");
        }
        for (name, color) in chart.colors() {
            parse_hex_color(color).with_context(|| format!("chart.{name}"))?;
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.params.sma_period, 730);
        assert_eq!(cfg.params.rsi_period, 14);
        assert_eq!(cfg.params.support_range_days, 60);
        assert_eq!(cfg.params.plot_range_days, 150);
        assert_eq!(cfg.params.short_sma_period, 20);
        assert_eq!(cfg.api.series_timeout_secs, 10);
        assert_eq!(cfg.api.shortener_timeout_secs, 2);
        assert_eq!(cfg.primary.label, "BTC");
        assert_eq!(cfg.peers.len(), 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.peers.len(), 5);
        assert_eq!(cfg.peers[0].name, "Ethereum");
        assert_eq!(cfg.peers[4].symbol, "GC=F");
        assert!(!cfg.peers[4].show_change);
        assert_eq!(cfg.chart.up_color, "#00ff00");
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r##"{
            "params": { "sma_period": 200 },
            "peers": [ { "symbol": "AAPL", "name": "Apple", "label": "AAPL" } ],
            "chart": { "up_color": "#123456" }
        }"##;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.params.sma_period, 200);
        assert_eq!(cfg.params.rsi_period, 14);
        assert_eq!(cfg.peers.len(), 1);
        assert_eq!(cfg.peers[0].currency, "$");
        assert!(cfg.peers[0].show_change);
        assert_eq!(cfg.chart.up_color, "#123456");
        assert_eq!(cfg.chart.down_color, "#ff3333");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_window() {
        let mut cfg = AppConfig::default();
        cfg.params.rsi_period = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("rsi_period"));
    }

    #[test]
    fn validate_rejects_bad_epsilon() {
        let mut cfg = AppConfig::default();
        cfg.params.rsi_loss_epsilon = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_peer_names() {
        let mut cfg = AppConfig::default();
        let dup = cfg.peers[0].clone();
        cfg.peers.push(dup);
        assert!(cfg.validate().unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn validate_rejects_bad_color_and_url() {
        let mut cfg = AppConfig::default();
        cfg.chart.sma_color = "orange".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.api.series_url = "not a url".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.api.shortener_url = "http://short.example/".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_fear_greed_url_is_allowed() {
        let mut cfg = AppConfig::default();
        cfg.api.fear_greed_url.clear();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#00ff00").unwrap(), (0, 255, 0));
        assert_eq!(parse_hex_color("FFA500").unwrap(), (255, 165, 0));
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = AppConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.peers.len(), cfg2.peers.len());
        assert_eq!(cfg.params.plot_range_days, cfg2.params.plot_range_days);
        assert_eq!(cfg.api.news_url, cfg2.api.news_url);
    }

    #[test]
    fn bundled_sample_config_is_valid() {
        let cfg: AppConfig = serde_json::from_str(include_str!("../briefing_config.json")).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.peers.len(), 5);
        assert_eq!(cfg.peers[2].currency, "");
        assert!(!cfg.peers[4].show_change);
        assert_eq!(cfg.primary.currency, "$");
        // Omitted fields fall back to defaults.
        assert_eq!(cfg.api.news_url, default_news_url());
        assert_eq!(cfg.chart.up_color, "#00ff00");
    }
}
