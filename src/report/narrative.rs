// =============================================================================
// Narrative Composer — qualitative market read + fixed-section report
// =============================================================================
//
// Trend:
//   close >  long SMA  =>  ALCISTA (bullish)
//   close <= long SMA  =>  BAJISTA (bearish)
//   SMA undefined      =>  INDETERMINADA
//
// Sentiment band (strict inequalities, 70 and 30 themselves are neutral):
//   RSI > 70  =>  overbought caution
//   RSI < 30  =>  oversold opportunity
//   otherwise =>  neutral / consolidating
//   undefined =>  not enough data
// =============================================================================

use crate::config::{AppConfig, PeerInstrument};
use crate::indicators::IndicatorSnapshot;
use crate::market_data::HeadlineDigest;
use crate::report::format::{grouped, money, opt_fixed, opt_signed_pct, signed_pct};
use crate::types::{FearGreedReading, Snapshot};

/// RSI above this is overbought.
pub const OVERBOUGHT: f64 = 70.0;
/// RSI below this is oversold.
pub const OVERSOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
    Undetermined,
}

impl Trend {
    pub fn from_snapshot(snapshot: &IndicatorSnapshot) -> Self {
        match snapshot.is_above_sma() {
            Some(true) => Self::Bullish,
            Some(false) => Self::Bearish,
            None => Self::Undetermined,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bullish => "ALCISTA 🐂",
            Self::Bearish => "BAJISTA 🐻",
            Self::Undetermined => "INDETERMINADA (historial insuficiente)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBand {
    Overbought,
    Oversold,
    Neutral,
    NoData,
}

impl SentimentBand {
    pub fn from_rsi(rsi: Option<f64>) -> Self {
        match rsi {
            Some(v) if v > OVERBOUGHT => Self::Overbought,
            Some(v) if v < OVERSOLD => Self::Oversold,
            Some(_) => Self::Neutral,
            None => Self::NoData,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Overbought => "⚠️ SOBRECOMPRA: Riesgo de corrección a corto plazo.",
            Self::Oversold => "💎 OPORTUNIDAD: Zona de rebote técnico.",
            Self::Neutral => "⚖️ NEUTRAL: Mercado consolidando niveles.",
            Self::NoData => "⏳ SIN DATOS: Historial insuficiente para el RSI.",
        }
    }
}

/// One-line qualitative read, e.g.
/// `⚖️ NEUTRAL: ... Tendencia de fondo (730d): ALCISTA 🐂`.
pub fn analysis_line(snapshot: &IndicatorSnapshot, sma_period: usize) -> String {
    let band = SentimentBand::from_rsi(snapshot.rsi);
    let trend = Trend::from_snapshot(snapshot);
    format!(
        "{} Tendencia de fondo ({sma_period}d): {}",
        band.message(),
        trend.label()
    )
}

/// Everything the report embeds besides configuration.
pub struct ReportInput<'a> {
    /// Display date, e.g. `19 Oct`.
    pub date: &'a str,
    pub indicators: &'a IndicatorSnapshot,
    /// Peer snapshots, one per configured peer.
    pub peers: &'a [Snapshot],
    pub headlines: &'a HeadlineDigest,
    pub fear_greed: Option<&'a FearGreedReading>,
}

/// Render the full multi-section briefing text.
pub fn compose_report(config: &AppConfig, input: &ReportInput<'_>) -> String {
    let params = &config.params;
    let primary = &config.primary;
    let ind = input.indicators;
    let currency = primary.currency.as_str();

    let fear_greed = input.fear_greed.map_or_else(String::new, |fng| {
        format!("🧭 Miedo y Codicia: {}/100 ({})\n", fng.value, fng.classification)
    });
    let peer_lines: String = config
        .peers
        .iter()
        .map(|peer| peer_line(peer, find_snapshot(input.peers, &peer.name)) + "\n")
        .collect();

    format!(
        "🇪🇸 *INFORME DIARIO – {date}*\n\
         \n\
         1️⃣ *SITUACIÓN*\n\
         \n\
         {analysis}\n\
         {fear_greed}\
         \n\
         2️⃣ *ACTIVOS CLAVE*\n\
         \n\
         • {icon} {label}: {price} ({chg})\n\
         {peer_lines}\
         \n\
         3️⃣ *TÉCNICO {label}*\n\
         \n\
         • RSI ({rsi_period}d): {rsi}\n\
         • Media ({sma_period}d): {sma}\n\
         • Soporte ({support_days}d): {support}\n\
         • Distancia ATH: {ath}\n\
         \n\
         4️⃣ *TITULARES*\n\
         \n\
         {headlines}\n",
        date = input.date,
        analysis = analysis_line(ind, params.sma_period),
        icon = primary.icon,
        label = primary.label,
        price = money(Some(ind.price), currency, 0),
        chg = opt_signed_pct(ind.chg),
        rsi_period = params.rsi_period,
        rsi = opt_fixed(ind.rsi, 1),
        sma_period = params.sma_period,
        sma = money(ind.sma, currency, 0),
        support_days = params.support_range_days,
        support = money(ind.range_low, currency, 0),
        ath = opt_signed_pct(ind.ath_dist),
        headlines = input.headlines.render(),
    )
}

fn find_snapshot(snapshots: &[Snapshot], name: &str) -> Snapshot {
    snapshots
        .iter()
        .find(|s| s.name == name)
        .cloned()
        .unwrap_or_else(|| Snapshot::sentinel(name))
}

fn peer_line(peer: &PeerInstrument, snap: Snapshot) -> String {
    let icon = if peer.icon.is_empty() {
        String::new()
    } else {
        format!("{} ", peer.icon)
    };
    let change = if peer.show_change {
        format!(" ({})", signed_pct(snap.change_pct))
    } else {
        String::new()
    };
    format!(
        "• {icon}{}: {}{}{change}",
        peer.label,
        peer.currency,
        grouped(snap.price, peer.decimals)
    )
}
