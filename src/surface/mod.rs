//! Chart surfaces: the rendering-engine boundary and the adapter that owns
//! one surface.
//!
//! [`RenderSurface`] and [`SurfaceBackend`] describe the external charting
//! engine. [`ChartSurfaceAdapter`] is the only code that mutates a surface.

pub mod adapter;
pub mod error;
pub mod headless;
pub mod options;

pub use adapter::ChartSurfaceAdapter;
pub use error::SurfaceError;
pub use headless::{HeadlessBackend, HeadlessSeries, HeadlessSurface};
pub use options::{SurfaceOptions, Theme};

use crate::models::{Candle, IndicatorPoint, PriceLevel, VisibleRange};
use crate::sync::RangeCallback;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Candlestick,
    Line,
    Histogram,
    /// Time points without values; keeps a pane's time scale aligned.
    Whitespace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStyle {
    pub title: String,
    pub color: Option<String>,
    pub line_width: u8,
    pub price_scale_id: Option<String>,
    pub last_value_visible: bool,
}

impl SeriesStyle {
    pub fn line(title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: Some(color.into()),
            line_width: 2,
            price_scale_id: None,
            last_value_visible: false,
        }
    }

    pub fn plain(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: None,
            line_width: 1,
            price_scale_id: None,
            last_value_visible: false,
        }
    }

    pub fn on_scale(mut self, price_scale_id: impl Into<String>) -> Self {
        self.price_scale_id = Some(price_scale_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBar {
    pub time: i64,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    Candles(Arc<[Candle]>),
    Line(Vec<IndicatorPoint>),
    Histogram(Vec<HistogramBar>),
    Whitespace(Vec<i64>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Candles(c) => c.len(),
            SeriesData::Line(p) => p.len(),
            SeriesData::Histogram(h) => h.len(),
            SeriesData::Whitespace(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First and last time of the (ascending) data.
    pub fn time_bounds(&self) -> Option<VisibleRange> {
        let (first, last) = match self {
            SeriesData::Candles(c) => (c.first()?.time, c.last()?.time),
            SeriesData::Line(p) => (p.first()?.time, p.last()?.time),
            SeriesData::Histogram(h) => (h.first()?.time, h.last()?.time),
            SeriesData::Whitespace(t) => (*t.first()?, *t.last()?),
        };
        Some(VisibleRange::new(first, last))
    }
}

/// Where a surface is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Whether the region is part of the visible document tree yet.
    pub attached: bool,
}

impl Container {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            attached: true,
        }
    }

    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }
}

/// One rendering surface of the external charting engine.
///
/// Implementations may invoke range-change subscribers synchronously from
/// `set_visible_range` and `fit_content`.
pub trait RenderSurface: Send + Sync {
    fn add_series(&self, kind: SeriesKind, style: SeriesStyle) -> Result<SeriesId, SurfaceError>;

    fn set_series_data(&self, series: SeriesId, data: SeriesData) -> Result<(), SurfaceError>;

    fn remove_series(&self, series: SeriesId) -> Result<(), SurfaceError>;

    fn set_price_lines(&self, series: SeriesId, levels: &[PriceLevel]) -> Result<(), SurfaceError>;

    fn visible_range(&self) -> Option<VisibleRange>;

    /// Best-effort; the surface may clamp to its data bounds.
    fn set_visible_range(&self, range: VisibleRange) -> Result<(), SurfaceError>;

    fn fit_content(&self);

    fn subscribe_visible_range_change(&self, callback: RangeCallback) -> SubscriberId;

    fn unsubscribe_visible_range_change(&self, id: SubscriberId);

    /// Release the surface. Further calls fail with [`SurfaceError::Disposed`].
    fn remove(&self);
}

/// Factory for surfaces (the engine's `createChart`).
pub trait SurfaceBackend: Send + Sync {
    fn create_surface(
        &self,
        container: &Container,
        options: &SurfaceOptions,
    ) -> Result<Arc<dyn RenderSurface>, SurfaceError>;
}
