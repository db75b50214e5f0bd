// =============================================================================
// Chart Module
// =============================================================================
//
// Renders the trailing window of the primary series as a PNG.  The renderer is
// a trait object so the briefing service can swap in a stub, and a failure
// here never takes the text report down with it.

mod candlestick;

use std::io::Cursor;
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use plotters::style::{register_font, FontStyle};
use tracing::{info, warn};

use crate::indicators::IndicatorSnapshot;
use crate::market_data::PriceSeries;

pub use candlestick::CandlestickChart;

/// Font family every chart text element is drawn with.
pub(crate) const FONT_FAMILY: &str = "sans-serif";

/// Turns a price series into encoded PNG bytes.
pub trait ChartRenderer: Send + Sync {
    /// `date` is the display date used in the chart title.
    fn render_png(
        &self,
        series: &PriceSeries,
        indicators: &IndicatorSnapshot,
        date: &str,
    ) -> Result<Vec<u8>>;
}

/// Encode a tightly packed RGB8 buffer as PNG.
pub fn encode_png(rgb: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_raw(width, height, rgb)
        .context("pixel buffer does not match the chart dimensions")?;
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .context("PNG encoding failed")?;
    Ok(out.into_inner())
}

/// Make sure a TrueType font is registered for [`FONT_FAMILY`].
///
/// The first readable, valid file in `paths` wins and stays registered for the
/// life of the process.  A miss is not remembered: the next render looks again.
pub(crate) fn ensure_font(paths: &[String]) -> Result<()> {
    static REGISTERED: OnceLock<String> = OnceLock::new();

    if REGISTERED.get().is_some() {
        return Ok(());
    }
    match register_first_font(paths) {
        Some(path) => {
            // A concurrent winner is fine: both registered a usable font.
            let _ = REGISTERED.set(path);
            Ok(())
        }
        None => bail!("no usable chart font among {} configured paths", paths.len()),
    }
}

fn register_first_font(paths: &[String]) -> Option<String> {
    for path in paths {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        // The registry keeps a &'static reference.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        if register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
            info!(path = %path, "Chart font registered");
            return Some(path.clone());
        }
        warn!(path = %path, "Font file rejected, trying next");
    }
    warn!("No chart font found, skipping chart");
    None
}
