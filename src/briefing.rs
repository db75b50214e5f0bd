// =============================================================================
// Briefing Service — one full daily briefing per call
// =============================================================================
//
// Sequence (strictly one network call at a time):
//
//   series  ->  peers  ->  headlines  ->  fear & greed  ->  indicators
//           ->  narrative  ->  chart  ->  BriefingResult
//
// Only the series is essential.  Every other collaborator degrades to a
// sentinel or placeholder, and the chart degrades to an empty image with a
// notice appended to the text.  Nothing in here ever fails the HTTP request.
// =============================================================================

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::FutureExt;
use tracing::{error, info, instrument, warn};

use crate::chart::{CandlestickChart, ChartRenderer};
use crate::config::AppConfig;
use crate::indicators::IndicatorSnapshot;
use crate::market_data::{FearGreedClient, HistoryClient, NewsClient, PriceSeries, QuoteClient};
use crate::report::{compose_report, ReportInput};
use crate::types::BriefingResult;

/// Appended to the report when the chart could not be produced.
pub const CHART_UNAVAILABLE: &str = "⚠️ Gráfico no disponible.";

pub struct BriefingService {
    config: Arc<AppConfig>,
    history: HistoryClient,
    quotes: QuoteClient,
    news: NewsClient,
    fear_greed: Option<FearGreedClient>,
    renderer: Arc<dyn ChartRenderer>,
}

impl BriefingService {
    pub fn new(
        config: Arc<AppConfig>,
        history: HistoryClient,
        quotes: QuoteClient,
        news: NewsClient,
        fear_greed: Option<FearGreedClient>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> Self {
        Self {
            config,
            history,
            quotes,
            news,
            fear_greed,
            renderer,
        }
    }

    /// Wire every collaborator from configuration, sharing one HTTP client.
    pub fn from_config(config: Arc<AppConfig>, client: reqwest::Client) -> Result<Self> {
        let renderer = Arc::new(CandlestickChart::from_config(&config)?);
        Ok(Self::new(
            Arc::clone(&config),
            HistoryClient::from_config(client.clone(), &config),
            QuoteClient::from_config(client.clone(), &config),
            NewsClient::from_config(client.clone(), &config),
            FearGreedClient::from_config(client, &config),
            renderer,
        ))
    }

    /// Produce a briefing.  Always returns a result; failures are described
    /// in `mensaje`.
    pub async fn run(&self) -> BriefingResult {
        guarded(self.build()).await
    }

    #[instrument(skip_all, name = "briefing::build")]
    async fn build(&self) -> Result<BriefingResult> {
        let config = &self.config;
        let label = &config.primary.label;

        let series = match self.history.fetch_series(&config.params).await {
            Ok(series) => series,
            Err(_) => return Ok(BriefingResult::text_only(series_failure_message(label))),
        };

        let peers = self.quotes.snapshots(&config.peers).await;
        let headlines = self.news.headlines().await;
        let fear_greed = match &self.fear_greed {
            Some(client) => client.reading().await,
            None => None,
        };

        let indicators = IndicatorSnapshot::compute(&series, &config.params)
            .ok_or_else(|| anyhow!("price series is empty"))?;
        let date = chrono::Local::now().format("%d %b").to_string();

        let mut mensaje = compose_report(
            config,
            &ReportInput {
                date: &date,
                indicators: &indicators,
                peers: &peers,
                headlines: &headlines,
                fear_greed: fear_greed.as_ref(),
            },
        );

        let imagen_base64 = match self.render_chart(series, indicators, date).await {
            Some(encoded) => encoded,
            None => {
                mensaje.push('\n');
                mensaje.push_str(CHART_UNAVAILABLE);
                String::new()
            }
        };

        info!(
            chars = mensaje.len(),
            image_bytes = imagen_base64.len(),
            "Briefing assembled"
        );
        Ok(BriefingResult {
            mensaje,
            imagen_base64,
        })
    }

    /// Render off the async executor.  Errors and panics both end up as `None`.
    async fn render_chart(
        &self,
        series: PriceSeries,
        indicators: IndicatorSnapshot,
        date: String,
    ) -> Option<String> {
        let renderer = Arc::clone(&self.renderer);
        let outcome =
            tokio::task::spawn_blocking(move || renderer.render_png(&series, &indicators, &date))
                .await;

        match outcome {
            Ok(Ok(png)) => Some(STANDARD.encode(png)),
            Ok(Err(e)) => {
                warn!(error = %format!("{e:#}"), "Chart rendering failed");
                None
            }
            Err(e) => {
                warn!(error = %e, "Chart task aborted");
                None
            }
        }
    }
}

pub fn series_failure_message(label: &str) -> String {
    format!("Error al obtener datos de {label}.")
}

/// Turn an error or a panic inside `fut` into the generic failure result.
async fn guarded<F>(fut: F) -> BriefingResult
where
    F: Future<Output = Result<BriefingResult>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(error = %format!("{e:#}"), "Briefing failed");
            BriefingResult::text_only(format!("Error inesperado: {e}"))
        }
        Err(payload) => {
            let detail = panic_detail(payload.as_ref());
            error!(panic = %detail, "Briefing panicked");
            BriefingResult::text_only(format!("Error inesperado: {detail}"))
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
