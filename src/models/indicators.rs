use serde::{Deserialize, Serialize};

/// A single derived value aligned to a source candle time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub time: i64,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Ordered output of one indicator computation. Always rebuilt, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&IndicatorPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&IndicatorPoint> {
        self.points.last()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

impl From<Vec<IndicatorPoint>> for IndicatorSeries {
    fn from(points: Vec<IndicatorPoint>) -> Self {
        Self { points }
    }
}

impl FromIterator<IndicatorPoint> for IndicatorSeries {
    fn from_iter<I: IntoIterator<Item = IndicatorPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorKind {
    Rsi,
    #[serde(alias = "MA")]
    Sma,
    Ema,
    VolumeMa,
}

impl IndicatorKind {
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Sma => "MA",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::VolumeMa => "VolMA",
        }
    }
}

/// User-controlled overlay parameters. Persisted elsewhere; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub id: String,
    pub kind: IndicatorKind,
    pub period: usize,
    pub visible: bool,
    pub color: String,
    pub opacity: f32,
}

impl IndicatorConfig {
    pub fn new(id: impl Into<String>, kind: IndicatorKind, period: usize) -> Self {
        Self {
            id: id.into(),
            kind,
            period,
            visible: true,
            color: "#FFFFFF".to_string(),
            opacity: 1.0,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Title shown next to the series, e.g. `EMA12`.
    pub fn title(&self) -> String {
        format!("{}{}", self.kind.label(), self.period)
    }

    /// `#RRGGBB` colors get the opacity appended as an alpha byte.
    pub fn effective_color(&self) -> String {
        with_alpha(&self.color, self.opacity)
    }

    /// Overlay set a fresh dashboard starts with.
    pub fn defaults() -> Vec<IndicatorConfig> {
        vec![
            IndicatorConfig::new("ma1", IndicatorKind::Ema, 12).with_color("#34D399"),
            IndicatorConfig::new("ma2", IndicatorKind::Ema, 20).with_color("#F472B6"),
            IndicatorConfig::new("ma3", IndicatorKind::Sma, 50).with_color("#CBD5E1"),
            IndicatorConfig::new("ma4", IndicatorKind::Sma, 200).with_color("#FF0000"),
            IndicatorConfig::new("volume_ma", IndicatorKind::VolumeMa, 55)
                .with_color("#FBBF24")
                .with_opacity(0.8),
            IndicatorConfig::new("rsi", IndicatorKind::Rsi, 14),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
    SparseDotted,
}

/// Horizontal line drawn across a series at `price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub color: String,
    pub style: LineStyle,
    #[serde(default = "default_line_width")]
    pub line_width: u8,
    /// Axis label; `None` draws the line unlabeled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

fn default_line_width() -> u8 {
    1
}

impl PriceLevel {
    pub fn new(price: f64, color: impl Into<String>, style: LineStyle) -> Self {
        Self {
            price,
            color: color.into(),
            style,
            line_width: default_line_width(),
            title: None,
        }
    }

    pub fn with_width(mut self, line_width: u8) -> Self {
        self.line_width = line_width;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Append `opacity` as an alpha byte to a `#RRGGBB` color. Other color
/// formats are returned unchanged.
pub fn with_alpha(color: &str, opacity: f32) -> String {
    let is_rgb_hex = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !is_rgb_hex {
        return color.to_string();
    }
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("{}{:02x}", color, alpha)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiPanelConfig {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
    pub show_level_80: bool,
    pub show_level_20: bool,
    pub level_color: String,
}

impl Default for RsiPanelConfig {
    fn default() -> Self {
        Self {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
            show_level_80: false,
            show_level_20: false,
            level_color: "rgba(156, 163, 175, 0.8)".to_string(),
        }
    }
}

impl RsiPanelConfig {
    pub fn guide_levels(&self) -> Vec<PriceLevel> {
        let mut levels = vec![
            PriceLevel::new(self.overbought, self.level_color.clone(), LineStyle::Solid),
            PriceLevel::new(self.oversold, self.level_color.clone(), LineStyle::Solid),
            PriceLevel::new(50.0, "rgba(156, 163, 175, 0.6)", LineStyle::Dashed),
        ];
        if self.show_level_80 {
            levels.push(PriceLevel::new(80.0, "rgba(156, 163, 175, 0.5)", LineStyle::Dotted));
        }
        if self.show_level_20 {
            levels.push(PriceLevel::new(20.0, "rgba(156, 163, 175, 0.5)", LineStyle::Dotted));
        }
        levels
    }
}
