use std::ops::Range;

use anyhow::{anyhow, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use tracing::{debug, instrument};

use super::{encode_png, ensure_font, ChartRenderer, FONT_FAMILY};
use crate::config::{parse_hex_color, AppConfig, ChartStyle};
use crate::indicators::IndicatorSnapshot;
use crate::market_data::PriceSeries;
use crate::report::format::grouped;
use crate::types::PriceBar;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const MARGIN: u32 = 12;
const Y_LABEL_AREA: u32 = 80;
const X_LABEL_AREA: u32 = 30;
/// Fraction of the per-bar slot filled by a candle body or volume bar.
const BODY_FILL: f64 = 0.7;
/// Headroom added above and below the price range.
const PRICE_PADDING: f64 = 0.03;

fn draw_err<E: std::fmt::Display>(err: E) -> anyhow::Error {
    anyhow!("chart drawing failed: {err}")
}

fn rgb(hex: &str) -> Result<RGBColor> {
    let (r, g, b) = parse_hex_color(hex)?;
    Ok(RGBColor(r, g, b))
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Palette {
    background: RGBColor,
    text: RGBColor,
    grid: RGBColor,
    up: RGBColor,
    down: RGBColor,
    sma: RGBColor,
    support: RGBColor,
    short_sma: RGBColor,
    legend_background: RGBColor,
}

impl Palette {
    fn from_style(style: &ChartStyle) -> Result<Self> {
        Ok(Self {
            background: rgb(&style.background)?,
            text: rgb(&style.text_color)?,
            grid: rgb(&style.grid_color)?,
            up: rgb(&style.up_color)?,
            down: rgb(&style.down_color)?,
            sma: rgb(&style.sma_color)?,
            support: rgb(&style.support_color)?,
            short_sma: rgb(&style.short_sma_color)?,
            legend_background: rgb(&style.legend_background)?,
        })
    }
}

// ---------------------------------------------------------------------------
// PlotWindow -- the trailing slice of the series that ends up on the chart
// ---------------------------------------------------------------------------

/// Bars and overlay points of the plotted window.  X coordinates are bar
/// indices relative to the window start.
#[derive(Debug)]
struct PlotWindow<'a> {
    bars: &'a [PriceBar],
    sma: Vec<(f64, f64)>,
    short_sma: Vec<(f64, f64)>,
    support: Option<f64>,
}

impl<'a> PlotWindow<'a> {
    fn new(series: &'a PriceSeries, indicators: &IndicatorSnapshot, days: usize) -> Option<Self> {
        if series.is_empty() || days == 0 {
            return None;
        }
        let start = series.tail_start(days);
        Some(Self {
            bars: &series.bars()[start..],
            sma: overlay_points(&series.sma()[start..]),
            short_sma: overlay_points(&series.short_sma()[start..]),
            support: indicators.range_low.filter(|v| v.is_finite()),
        })
    }

    fn x_range(&self) -> Range<f64> {
        -0.5..(self.bars.len() as f64 - 0.5)
    }

    fn price_range(&self) -> Range<f64> {
        let bar_values = self.bars.iter().flat_map(|b| [b.low, b.high]);
        let overlay_values = self.sma.iter().chain(&self.short_sma).map(|&(_, y)| y);
        let (lo, hi) = bar_values
            .chain(overlay_values)
            .chain(self.support)
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        if !lo.is_finite() {
            return 0.0..1.0;
        }
        let pad = ((hi - lo) * PRICE_PADDING).max(hi.abs() * 0.001).max(1e-9);
        (lo - pad)..(hi + pad)
    }

    fn volume_max(&self) -> f64 {
        let max = self
            .bars
            .iter()
            .map(|b| b.volume)
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        if max > 0.0 {
            max * 1.1
        } else {
            1.0
        }
    }

    /// Label for the bar nearest to `x`, blank outside the window.
    fn date_label(&self, x: f64) -> String {
        let i = x.round();
        if i < 0.0 || i >= self.bars.len() as f64 {
            return String::new();
        }
        self.bars[i as usize].timestamp.format("%d %b").to_string()
    }
}

fn overlay_points(column: &[Option<f64>]) -> Vec<(f64, f64)> {
    column
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|v| v.is_finite()).map(|v| (i as f64, v)))
        .collect()
}

/// `1.2M`-style axis labels for volume.
fn compact_volume(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", v / 1e3)
    } else {
        format!("{v:.0}")
    }
}

// ---------------------------------------------------------------------------
// CandlestickChart
// ---------------------------------------------------------------------------

/// Dark-theme candlestick chart with a volume panel underneath.
///
/// Overlays: long SMA (only once it is defined inside the window), short SMA
/// and a dashed horizontal support line at the recent range low.
#[derive(Debug, Clone)]
pub struct CandlestickChart {
    width: u32,
    height: u32,
    show_grid: bool,
    palette: Palette,
    font_paths: Vec<String>,
    pair: String,
    currency: String,
    plot_range_days: usize,
    sma_period: usize,
    short_sma_period: usize,
    support_range_days: usize,
}

impl CandlestickChart {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let style = &config.chart;
        Ok(Self {
            width: style.width,
            height: style.height,
            show_grid: style.show_grid,
            palette: Palette::from_style(style)?,
            font_paths: style.font_paths.clone(),
            pair: config.primary.pair.clone(),
            currency: config.primary.currency.clone(),
            plot_range_days: config.params.plot_range_days,
            sma_period: config.params.sma_period,
            short_sma_period: config.params.short_sma_period,
            support_range_days: config.params.support_range_days,
        })
    }

    /// Candle body width in pixels for `bars` candles.
    fn candle_width(&self, bars: usize) -> u32 {
        let plot_px = self.width.saturating_sub(Y_LABEL_AREA + 2 * MARGIN) as f64;
        ((plot_px / bars.max(1) as f64) * BODY_FILL).max(1.0) as u32
    }

    fn draw(&self, root: &Area<'_>, window: &PlotWindow<'_>, date: &str) -> Result<()> {
        let p = &self.palette;
        root.fill(&p.background).map_err(draw_err)?;

        let split = (self.height as i32) * 4 / 5;
        let (upper, lower) = root.split_vertically(split);
        self.draw_price_panel(&upper, window, date)?;
        self.draw_volume_panel(&lower, window)?;

        root.present().map_err(draw_err)
    }

    fn draw_price_panel(&self, area: &Area<'_>, window: &PlotWindow<'_>, date: &str) -> Result<()> {
        let p = self.palette;
        let text_style = (FONT_FAMILY, 14).into_font().color(&p.text);

        let mut chart = ChartBuilder::on(area)
            .caption(
                format!("{} | {}", self.pair, date),
                (FONT_FAMILY, 24).into_font().color(&p.text),
            )
            .margin(MARGIN)
            .x_label_area_size(0)
            .y_label_area_size(Y_LABEL_AREA)
            .build_cartesian_2d(window.x_range(), window.price_range())
            .map_err(draw_err)?;

        let price_fmt = |v: &f64| grouped(*v, 0);
        let mut mesh = chart.configure_mesh();
        mesh.axis_style(p.text)
            .label_style(text_style.clone())
            .y_labels(8)
            .y_label_formatter(&price_fmt);
        if self.show_grid {
            mesh.bold_line_style(p.grid).light_line_style(TRANSPARENT);
        } else {
            mesh.disable_mesh();
        }
        mesh.draw().map_err(draw_err)?;

        let body = self.candle_width(window.bars.len());
        chart
            .draw_series(window.bars.iter().enumerate().map(|(i, b)| {
                CandleStick::new(
                    i as f64,
                    b.open,
                    b.high,
                    b.low,
                    b.close,
                    p.up.filled(),
                    p.down.filled(),
                    body,
                )
            }))
            .map_err(draw_err)?;

        if !window.sma.is_empty() {
            let color = p.sma;
            chart
                .draw_series(LineSeries::new(window.sma.iter().copied(), color.stroke_width(2)))
                .map_err(draw_err)?
                .label(format!("SMA {}d", self.sma_period))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        if !window.short_sma.is_empty() {
            let color = p.short_sma;
            chart
                .draw_series(LineSeries::new(
                    window.short_sma.iter().copied(),
                    color.stroke_width(1),
                ))
                .map_err(draw_err)?
                .label(format!("SMA {}d", self.short_sma_period))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(1)));
        }

        if let Some(level) = window.support {
            let color = p.support;
            let x = window.x_range();
            chart
                .draw_series(DashedLineSeries::new(
                    vec![(x.start, level), (x.end, level)],
                    10,
                    6,
                    color.stroke_width(2),
                ))
                .map_err(draw_err)?
                .label(format!(
                    "Soporte {}d: {}{}",
                    self.support_range_days,
                    self.currency,
                    grouped(level, 0)
                ))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(p.legend_background.mix(0.9))
            .border_style(p.text)
            .label_font(text_style)
            .draw()
            .map_err(draw_err)
    }

    fn draw_volume_panel(&self, area: &Area<'_>, window: &PlotWindow<'_>) -> Result<()> {
        let p = self.palette;

        let mut chart = ChartBuilder::on(area)
            .margin(MARGIN)
            .margin_top(0)
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(Y_LABEL_AREA)
            .build_cartesian_2d(window.x_range(), 0.0..window.volume_max())
            .map_err(draw_err)?;

        let date_fmt = |x: &f64| window.date_label(*x);
        let volume_fmt = |v: &f64| compact_volume(*v);
        let mut mesh = chart.configure_mesh();
        mesh.axis_style(p.text)
            .label_style((FONT_FAMILY, 13).into_font().color(&p.text))
            .x_labels(8)
            .x_label_formatter(&date_fmt)
            .y_labels(3)
            .y_label_formatter(&volume_fmt);
        if self.show_grid {
            mesh.bold_line_style(p.grid).light_line_style(TRANSPARENT);
        } else {
            mesh.disable_mesh();
        }
        mesh.draw().map_err(draw_err)?;

        let half = 0.5 * BODY_FILL;
        chart
            .draw_series(window.bars.iter().enumerate().map(|(i, b)| {
                let color = if b.is_up() { p.up } else { p.down };
                let x = i as f64;
                Rectangle::new(
                    [(x - half, 0.0), (x + half, b.volume.max(0.0))],
                    color.mix(0.6).filled(),
                )
            }))
            .map_err(draw_err)?;

        Ok(())
    }
}

impl ChartRenderer for CandlestickChart {
    #[instrument(skip_all, fields(bars = series.len()))]
    fn render_png(
        &self,
        series: &PriceSeries,
        indicators: &IndicatorSnapshot,
        date: &str,
    ) -> Result<Vec<u8>> {
        let window = PlotWindow::new(series, indicators, self.plot_range_days)
            .ok_or_else(|| anyhow!("nothing to plot"))?;
        ensure_font(&self.font_paths)?;

        let mut rgb = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut rgb, (self.width, self.height))
                .into_drawing_area();
            self.draw(&root, &window, date)?;
        }

        let png = encode_png(rgb, self.width, self.height)?;
        debug!(window = window.bars.len(), bytes = png.len(), "Chart rendered");
        Ok(png)
    }
}
