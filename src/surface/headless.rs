//! In-memory rendering backend.
//!
//! Keeps series data, price lines and the visible range the way a chart
//! widget would, without drawing anything. Range-change subscribers are
//! invoked synchronously.

use super::{
    Container, RenderSurface, SeriesData, SeriesId, SeriesKind, SeriesStyle, SubscriberId,
    SurfaceBackend, SurfaceError, SurfaceOptions,
};
use crate::common::lock;
use crate::models::{PriceLevel, VisibleRange};
use crate::sync::RangeCallback;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSeries {
    pub kind: SeriesKind,
    pub style: SeriesStyle,
    pub data: SeriesData,
    pub price_lines: Vec<PriceLevel>,
}

#[derive(Default)]
struct SurfaceState {
    next_series: u64,
    series: BTreeMap<SeriesId, HeadlessSeries>,
    visible: Option<VisibleRange>,
}

impl SurfaceState {
    fn data_bounds(&self) -> Option<VisibleRange> {
        self.series
            .values()
            .filter_map(|s| s.data.time_bounds())
            .reduce(|a, b| VisibleRange::new(a.from.min(b.from), a.to.max(b.to)))
    }
}

pub struct HeadlessSurface {
    container_id: String,
    options: SurfaceOptions,
    state: Mutex<SurfaceState>,
    subscribers: Mutex<Vec<(SubscriberId, RangeCallback)>>,
    next_subscriber: AtomicU64,
    removed: AtomicBool,
}

impl HeadlessSurface {
    pub fn new(container_id: impl Into<String>, options: SurfaceOptions) -> Self {
        Self {
            container_id: container_id.into(),
            options,
            state: Mutex::new(SurfaceState::default()),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber: AtomicU64::new(1),
            removed: AtomicBool::new(false),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn options(&self) -> &SurfaceOptions {
        &self.options
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }

    pub fn series_count(&self) -> usize {
        lock(&self.state).series.len()
    }

    pub fn series(&self, id: SeriesId) -> Option<HeadlessSeries> {
        lock(&self.state).series.get(&id).cloned()
    }

    pub fn series_titled(&self, title: &str) -> Option<HeadlessSeries> {
        lock(&self.state)
            .series
            .values()
            .find(|s| s.style.title == title)
            .cloned()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Simulate the user dragging the time axis by `seconds`.
    pub fn scroll_by(&self, seconds: i64) -> Result<(), SurfaceError> {
        match self.visible_range() {
            Some(range) => self.set_visible_range(range.shifted(seconds)),
            None => Ok(()),
        }
    }

    fn ensure_live(&self) -> Result<(), SurfaceError> {
        if self.is_removed() {
            return Err(SurfaceError::Disposed);
        }
        Ok(())
    }

    /// Store `next` and notify subscribers if it differs from the current range.
    fn update_range(&self, next: VisibleRange) {
        {
            let mut state = lock(&self.state);
            if state.visible == Some(next) {
                return;
            }
            state.visible = Some(next);
        }
        let callbacks: Vec<RangeCallback> = lock(&self.subscribers)
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(next);
        }
    }
}

impl RenderSurface for HeadlessSurface {
    fn add_series(&self, kind: SeriesKind, style: SeriesStyle) -> Result<SeriesId, SurfaceError> {
        self.ensure_live()?;
        let mut state = lock(&self.state);
        state.next_series += 1;
        let id = SeriesId(state.next_series);
        let data = match kind {
            SeriesKind::Candlestick => SeriesData::Candles(Arc::from(Vec::new())),
            SeriesKind::Line => SeriesData::Line(Vec::new()),
            SeriesKind::Histogram => SeriesData::Histogram(Vec::new()),
            SeriesKind::Whitespace => SeriesData::Whitespace(Vec::new()),
        };
        state.series.insert(
            id,
            HeadlessSeries {
                kind,
                style,
                data,
                price_lines: Vec::new(),
            },
        );
        Ok(id)
    }

    fn set_series_data(&self, series: SeriesId, data: SeriesData) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        let mut state = lock(&self.state);
        let entry = state
            .series
            .get_mut(&series)
            .ok_or(SurfaceError::UnknownSeries(series))?;
        entry.data = data;
        Ok(())
    }

    fn remove_series(&self, series: SeriesId) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        lock(&self.state)
            .series
            .remove(&series)
            .map(|_| ())
            .ok_or(SurfaceError::UnknownSeries(series))
    }

    fn set_price_lines(&self, series: SeriesId, levels: &[PriceLevel]) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        let mut state = lock(&self.state);
        let entry = state
            .series
            .get_mut(&series)
            .ok_or(SurfaceError::UnknownSeries(series))?;
        entry.price_lines = levels.to_vec();
        Ok(())
    }

    fn visible_range(&self) -> Option<VisibleRange> {
        if self.is_removed() {
            return None;
        }
        lock(&self.state).visible
    }

    fn set_visible_range(&self, range: VisibleRange) -> Result<(), SurfaceError> {
        self.ensure_live()?;
        let bounds = lock(&self.state).data_bounds();
        let Some(bounds) = bounds else {
            return Ok(());
        };
        match range.clamp_to(bounds) {
            Some(clamped) => self.update_range(clamped),
            None => debug!(
                container = %self.container_id,
                requested = %range,
                "range outside data bounds, ignored"
            ),
        }
        Ok(())
    }

    fn fit_content(&self) {
        if self.is_removed() {
            return;
        }
        let bounds = lock(&self.state).data_bounds();
        if let Some(bounds) = bounds {
            self.update_range(bounds);
        }
    }

    fn subscribe_visible_range_change(&self, callback: RangeCallback) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::SeqCst));
        lock(&self.subscribers).push((id, callback));
        id
    }

    fn unsubscribe_visible_range_change(&self, id: SubscriberId) {
        lock(&self.subscribers).retain(|(sub, _)| *sub != id);
    }

    fn remove(&self) {
        if self.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.subscribers).clear();
        let mut state = lock(&self.state);
        state.series.clear();
        state.visible = None;
        debug!(container = %self.container_id, "headless surface removed");
    }
}

/// Backend creating [`HeadlessSurface`]s; remembers every surface it made.
#[derive(Default)]
pub struct HeadlessBackend {
    surfaces: Mutex<Vec<Arc<HeadlessSurface>>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surfaces(&self) -> Vec<Arc<HeadlessSurface>> {
        lock(&self.surfaces).clone()
    }

    /// Most recent surface created for `container_id`.
    pub fn surface_for(&self, container_id: &str) -> Option<Arc<HeadlessSurface>> {
        lock(&self.surfaces)
            .iter()
            .rev()
            .find(|s| s.container_id() == container_id)
            .cloned()
    }

    pub fn live_surfaces(&self) -> usize {
        lock(&self.surfaces)
            .iter()
            .filter(|s| !s.is_removed())
            .count()
    }
}

impl SurfaceBackend for HeadlessBackend {
    fn create_surface(
        &self,
        container: &Container,
        options: &SurfaceOptions,
    ) -> Result<Arc<dyn RenderSurface>, SurfaceError> {
        if !container.attached {
            return Err(SurfaceError::Init {
                container: container.id.clone(),
                reason: "container is not attached to the document".to_string(),
            });
        }
        let options = SurfaceOptions {
            width: container.width,
            height: container.height,
            ..options.clone()
        };
        let surface = Arc::new(HeadlessSurface::new(container.id.clone(), options));
        lock(&self.surfaces).push(surface.clone());
        debug!(container = %container.id, "headless surface created");
        Ok(surface)
    }
}
