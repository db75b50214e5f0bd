// =============================================================================
// Market Briefing — Main Entry Point
// =============================================================================
//
//   market-briefing             serve GET /briefing and GET /health
//   market-briefing once [png]  run one briefing, print it, save the chart
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod briefing;
mod chart;
mod config;
mod error;
mod indicators;
mod market_data;
mod report;
mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::AppConfig;

const DEFAULT_CONFIG_PATH: &str = "briefing_config.json";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PNG_PATH: &str = "briefing.png";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── 2. Configuration ─────────────────────────────────────────────────
    let config_path =
        std::env::var("BRIEFING_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let config = load_config(Path::new(&config_path))?;
    config.validate().context("invalid configuration")?;

    // ── 3. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(AppState::new(config)?);

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("serve") => serve(state).await,
        Some("once") => {
            let png_path = args.next().unwrap_or_else(|| DEFAULT_PNG_PATH.into());
            once(&state, Path::new(&png_path)).await
        }
        Some(other) => bail!("unknown command '{other}', expected 'serve' or 'once [png-path]'"),
    }
}

/// Missing file means defaults; a file that exists but does not parse is an
/// error.
fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    AppConfig::load(path)
}

async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let bind_addr =
        std::env::var("BRIEFING_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());

    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Market briefing shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received — stopping gracefully");
}

async fn once(state: &AppState, png_path: &Path) -> anyhow::Result<()> {
    let result = state.briefing.run().await;
    println!("{}", result.mensaje);

    if result.has_image() {
        let png = STANDARD
            .decode(&result.imagen_base64)
            .context("briefing image is not valid base64")?;
        tokio::fs::write(png_path, &png)
            .await
            .with_context(|| format!("failed to write chart to {}", png_path.display()))?;
        info!(path = %png_path.display(), bytes = png.len(), "Chart saved");
    } else {
        warn!("Briefing produced no chart");
    }
    Ok(())
}
