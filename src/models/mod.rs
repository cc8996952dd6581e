//! Shared data models spanning the chart layers.

pub mod analysis;
pub mod candle;
pub mod indicators;
pub mod range;

pub use analysis::{AnalysisDisplay, AnalysisPoint, ChartAnalysis, FibonacciLevel, RangeMarkers};
pub use candle::Candle;
pub use indicators::{
    IndicatorConfig, IndicatorKind, IndicatorPoint, IndicatorSeries, LineStyle, PriceLevel,
    RsiPanelConfig,
};
pub use range::VisibleRange;
