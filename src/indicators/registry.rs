//! Indicator registry: maps a config to its calculation and its pane

use super::momentum::calculate_rsi;
use super::trend::{calculate_ema, calculate_sma};
use super::volume::calculate_volume_sma;
use crate::models::{Candle, IndicatorConfig, IndicatorKind, IndicatorSeries};

/// Indicator category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorCategory {
    Momentum,
    Trend,
    Volume,
}

/// Chart surface an overlay is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    /// Main chart: candles, moving averages, volume.
    Price,
    /// Sub-panel with a fixed 0..100 scale.
    Oscillator,
}

/// Trait for all indicators
pub trait Indicator {
    /// Get the category this indicator belongs to
    fn category(&self) -> IndicatorCategory;

    /// Get the name of the indicator
    fn name(&self) -> &'static str;

    fn pane(&self) -> Pane;
}

impl Indicator for IndicatorKind {
    fn category(&self) -> IndicatorCategory {
        match self {
            IndicatorKind::Rsi => IndicatorCategory::Momentum,
            IndicatorKind::Sma | IndicatorKind::Ema => IndicatorCategory::Trend,
            IndicatorKind::VolumeMa => IndicatorCategory::Volume,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "Relative Strength Index",
            IndicatorKind::Sma => "Simple Moving Average",
            IndicatorKind::Ema => "Exponential Moving Average",
            IndicatorKind::VolumeMa => "Volume Moving Average",
        }
    }

    fn pane(&self) -> Pane {
        match self {
            IndicatorKind::Rsi => Pane::Oscillator,
            _ => Pane::Price,
        }
    }
}

/// Compute the series described by `config`. Visibility is ignored here;
/// callers decide whether to draw.
pub fn compute(config: &IndicatorConfig, candles: &[Candle]) -> IndicatorSeries {
    match config.kind {
        IndicatorKind::Rsi => calculate_rsi(candles, config.period),
        IndicatorKind::Sma => calculate_sma(candles, config.period),
        IndicatorKind::Ema => calculate_ema(candles, config.period),
        IndicatorKind::VolumeMa => calculate_volume_sma(candles, config.period),
    }
}

/// Configs that belong on `pane`, in their original order.
pub fn configs_for_pane(configs: &[IndicatorConfig], pane: Pane) -> Vec<IndicatorConfig> {
    configs
        .iter()
        .filter(|config| config.kind.pane() == pane)
        .cloned()
        .collect()
}

/// Get all categories
pub fn all_categories() -> Vec<IndicatorCategory> {
    vec![
        IndicatorCategory::Momentum,
        IndicatorCategory::Trend,
        IndicatorCategory::Volume,
    ]
}
