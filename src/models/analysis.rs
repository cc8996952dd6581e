//! Price-pane annotations: levels returned by chart analysis and the
//! MAX/MIN markers of the loaded data.

use super::candle::Candle;
use super::indicators::{with_alpha, LineStyle, PriceLevel};
use serde::{Deserialize, Serialize};

/// One level picked out by an analysis. Either `level` or a two-price
/// `zone` locates it; a zone is drawn at its midpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPoint {
    pub kind: String,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub zone: Option<Vec<f64>>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl AnalysisPoint {
    pub fn at(kind: impl Into<String>, level: f64) -> Self {
        Self {
            kind: kind.into(),
            level: Some(level),
            zone: None,
            label: None,
            direction: None,
        }
    }

    pub fn zone(kind: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            kind: kind.into(),
            level: None,
            zone: Some(vec![low, high]),
            label: None,
            direction: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    pub fn price(&self) -> Option<f64> {
        if let Some(level) = self.level {
            return Some(level);
        }
        match self.zone.as_deref() {
            Some([low, high, ..]) => Some((low + high) / 2.0),
            _ => None,
        }
    }

    fn is_bearish(&self) -> bool {
        self.direction
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case("bearish"))
    }

    fn is_short(&self) -> bool {
        self.direction
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case("short"))
    }
}

/// Fibonacci level: `level` is the ratio (0.618), `price` where it lands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    pub level: f64,
    pub price: f64,
}

/// Levels an external analysis produced for the current chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartAnalysis {
    #[serde(default)]
    pub key_points: Vec<AnalysisPoint>,
    #[serde(default)]
    pub retracements: Vec<FibonacciLevel>,
    #[serde(default)]
    pub extensions: Vec<FibonacciLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDisplay {
    pub visible: bool,
    pub opacity: f64,
}

impl Default for AnalysisDisplay {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 0.6,
        }
    }
}

const GREEN: (u8, u8, u8) = (34, 197, 94);
const RED: (u8, u8, u8) = (239, 68, 68);
const BLUE: (u8, u8, u8) = (59, 130, 246);
const ORANGE: (u8, u8, u8) = (249, 115, 22);
const PURPLE: (u8, u8, u8) = (168, 85, 247);
const YELLOW: (u8, u8, u8) = (251, 191, 36);
const PINK: (u8, u8, u8) = (220, 38, 127);
const GRAY: (u8, u8, u8) = (156, 163, 175);

// Analyses come back in English or Spanish.
const ENTRY_WORDS: &[&str] = &["entry", "entrada"];
const TAKE_PROFIT_WORDS: &[&str] = &["tp", "take profit", "objetivo"];
const STOP_LOSS_WORDS: &[&str] = &["sl", "stop loss", "perdida"];

fn rgba((r, g, b): (u8, u8, u8), opacity: f64) -> String {
    format!("rgba({}, {}, {}, {})", r, g, b, opacity.clamp(0.0, 1.0))
}

fn mentions(kind: &str, words: &[&str]) -> bool {
    words.iter().any(|word| kind.contains(word))
}

/// Color family for a key point; first match wins.
fn point_color(point: &AnalysisPoint) -> (u8, u8, u8) {
    let kind = point.kind.to_lowercase();
    if kind.contains("fvg") {
        return if point.is_bearish() { RED } else { GREEN };
    }
    if kind.contains("ob") || kind.contains("order block") || kind.contains("poi") {
        return if point.is_bearish() || kind.contains("oferta") { ORANGE } else { BLUE };
    }
    if kind.contains("bsl") || kind.contains("liquidity") || kind.contains("liquidez") {
        return PURPLE;
    }
    if kind.contains("bos") || kind.contains("choch") {
        return if kind.contains("bajista") { RED } else { GREEN };
    }
    if mentions(&kind, ENTRY_WORDS) {
        return if point.is_short() || kind.contains("corto") { RED } else { GREEN };
    }
    if mentions(&kind, TAKE_PROFIT_WORDS) {
        return YELLOW;
    }
    if mentions(&kind, STOP_LOSS_WORDS) {
        return PINK;
    }
    if kind.contains("fib") {
        return PURPLE;
    }
    GRAY
}

/// Entries are solid and thicker; targets dotted; stops sparse-dotted.
fn point_stroke(kind: &str) -> (LineStyle, u8) {
    let kind = kind.to_lowercase();
    if mentions(&kind, ENTRY_WORDS) {
        (LineStyle::Solid, 2)
    } else if mentions(&kind, &TAKE_PROFIT_WORDS[..2]) {
        (LineStyle::Dotted, 1)
    } else if mentions(&kind, &STOP_LOSS_WORDS[..2]) {
        (LineStyle::SparseDotted, 1)
    } else {
        (LineStyle::Dashed, 1)
    }
}

impl ChartAnalysis {
    /// Price lines for the candle series. Hidden analyses draw nothing;
    /// points without a price are skipped.
    pub fn price_levels(&self, display: &AnalysisDisplay) -> Vec<PriceLevel> {
        if !display.visible {
            return Vec::new();
        }

        let points = self.key_points.iter().enumerate().filter_map(|(idx, point)| {
            let price = point.price()?;
            let (style, width) = point_stroke(&point.kind);
            let title = point
                .label
                .clone()
                .unwrap_or_else(|| format!("{} {}", point.kind, idx + 1));
            Some(
                PriceLevel::new(price, rgba(point_color(point), display.opacity), style)
                    .with_width(width)
                    .with_title(title),
            )
        });

        let retracements = self.retracements.iter().map(|fib| {
            PriceLevel::new(fib.price, rgba(PURPLE, display.opacity), LineStyle::Dashed)
                .with_title(format!("Fib {:.1}%", fib.level * 100.0))
        });

        let extensions = self.extensions.iter().map(|fib| {
            PriceLevel::new(fib.price, rgba(PURPLE, display.opacity), LineStyle::Dotted)
                .with_title(format!("Fib Ext {:.1}%", fib.level * 100.0))
        });

        points.chain(retracements).chain(extensions).collect()
    }
}

/// Dashed MAX/MIN lines at the extremes of the loaded candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeMarkers {
    pub visible: bool,
    pub color: String,
    pub opacity: f32,
}

impl Default for RangeMarkers {
    fn default() -> Self {
        Self {
            visible: false,
            color: "#888888".to_string(),
            opacity: 0.6,
        }
    }
}

impl RangeMarkers {
    pub fn levels(&self, candles: &[Candle]) -> Vec<PriceLevel> {
        if !self.visible || candles.is_empty() {
            return Vec::new();
        }
        let max = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let min = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let color = with_alpha(&self.color, self.opacity);
        vec![
            PriceLevel::new(max, color.clone(), LineStyle::Dashed).with_title(format!("MAX: {:.4}", max)),
            PriceLevel::new(min, color, LineStyle::Dashed).with_title(format!("MIN: {:.4}", min)),
        ]
    }
}
