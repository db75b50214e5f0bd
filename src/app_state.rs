// =============================================================================
// Central Application State
// =============================================================================
//
// Built once at startup and shared with every request handler as
// `Arc<AppState>`.  Configuration is immutable after load, so nothing in here
// needs a lock; each request runs its own briefing against the shared
// collaborators.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;

use crate::briefing::BriefingService;
use crate::config::AppConfig;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub briefing: BriefingService,
    /// Process start, for uptime in the health response.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let config = Arc::new(config);
        let client = http_client(&config)?;
        let briefing = BriefingService::from_config(Arc::clone(&config), client)
            .context("failed to build briefing service")?;

        info!(
            peers = config.peers.len(),
            fear_greed = !config.api.fear_greed_url.is_empty(),
            "Application state initialised"
        );

        Ok(Self {
            config,
            briefing,
            started_at: Instant::now(),
        })
    }

    /// Seconds since startup.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// One pooled HTTP client for every upstream, identifying itself with the
/// configured User-Agent.  Timeouts are applied per request.
fn http_client(config: &AppConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    let agent = HeaderValue::from_str(&config.api.user_agent)
        .context("user_agent is not a valid header value")?;
    headers.insert(USER_AGENT, agent);

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .context("failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_default_config() {
        let state = AppState::new(AppConfig::default()).unwrap();
        assert_eq!(state.config.peers.len(), 5);
        assert!(state.uptime_secs() < 5);
    }

    #[test]
    fn rejects_user_agent_with_newline() {
        let mut config = AppConfig::default();
        config.api.user_agent = "bad\nagent".into();
        assert!(AppState::new(config).is_err());
    }
}
