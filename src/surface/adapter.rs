//! Adapter owning exactly one rendering surface.
//!
//! Everything that touches a surface goes through here: primary data,
//! indicator overlays, guide levels and the visible range. The adapter
//! remembers what it rendered so a re-initialized surface can be replayed.

use super::{
    Container, HistogramBar, RenderSurface, SeriesData, SeriesId, SeriesKind, SeriesStyle,
    SubscriberId, SurfaceBackend, SurfaceError, SurfaceOptions,
};
use crate::common::lock;
use crate::indicators::{compute, configs_for_pane, Indicator, Pane};
use crate::models::{
    Candle, IndicatorConfig, IndicatorKind, IndicatorSeries, PriceLevel, RangeMarkers, VisibleRange,
};
use crate::sync::{RangeCallback, RangeOrigin, RangeSubscription, TimeScale};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info};

const VOLUME_SCALE: &str = "volume_scale";
const VOLUME_UP: &str = "#26A69A";
const VOLUME_DOWN: &str = "#EF5350";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverlayOwner {
    /// Derived from the adapter's indicator configs; rebuilt with the candles.
    Indicator,
    /// Set explicitly through [`ChartSurfaceAdapter::set_overlay`].
    Manual,
}

#[derive(Debug, Clone)]
struct Overlay {
    series: IndicatorSeries,
    style: SeriesStyle,
    price_lines: Vec<PriceLevel>,
    owner: OverlayOwner,
}

struct MountedSurface {
    surface: Arc<dyn RenderSurface>,
    forwarder: SubscriberId,
    primary: SeriesId,
    primary_kind: SeriesKind,
    volume: Option<SeriesId>,
    overlay_series: HashMap<String, (SeriesId, SeriesStyle)>,
}

#[derive(Default)]
struct AdapterState {
    mounted: Option<MountedSurface>,
    candles: Option<Arc<[Candle]>>,
    indicators: Vec<IndicatorConfig>,
    guide_levels: Vec<PriceLevel>,
    overlays: BTreeMap<String, Overlay>,
    /// Lines on the primary series set by the owner (analysis levels).
    annotations: Vec<PriceLevel>,
    range_markers: RangeMarkers,
}

impl AdapterState {
    /// Annotations first, then the MAX/MIN markers of the current candles.
    fn primary_lines(&self) -> Vec<PriceLevel> {
        let mut lines = self.annotations.clone();
        if let Some(candles) = &self.candles {
            lines.extend(self.range_markers.levels(candles));
        }
        lines
    }
}

/// Fan-out of surface range changes to adapter listeners.
#[derive(Default)]
struct RangeListeners {
    callbacks: Mutex<Vec<(u64, RangeCallback)>>,
    next_id: AtomicU64,
    last_seen: Mutex<Option<VisibleRange>>,
    suppressed: AtomicUsize,
}

impl RangeListeners {
    fn dispatch(&self, range: VisibleRange) {
        {
            let mut last = lock(&self.last_seen);
            if *last == Some(range) {
                return;
            }
            *last = Some(range);
        }
        if self.suppressed.load(Ordering::SeqCst) > 0 {
            return;
        }
        let callbacks: Vec<RangeCallback> = lock(&self.callbacks)
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(range);
        }
    }

    fn add(&self, callback: RangeCallback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.callbacks).push((id, callback));
        id
    }

    fn remove(&self, id: u64) {
        lock(&self.callbacks).retain(|(existing, _)| *existing != id);
    }

    fn count(&self) -> usize {
        lock(&self.callbacks).len()
    }

    fn reset(&self) {
        *lock(&self.last_seen) = None;
    }
}

/// Keeps range events from reaching listeners while a synchronized range is
/// being applied.
struct Suppress<'a>(&'a AtomicUsize);

impl<'a> Suppress<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Suppress<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ChartSurfaceAdapter {
    name: String,
    pane: Pane,
    backend: Arc<dyn SurfaceBackend>,
    state: Mutex<AdapterState>,
    listeners: Arc<RangeListeners>,
    sync_driven: AtomicBool,
}

impl ChartSurfaceAdapter {
    pub fn new(name: impl Into<String>, pane: Pane, backend: Arc<dyn SurfaceBackend>) -> Self {
        Self {
            name: name.into(),
            pane,
            backend,
            state: Mutex::new(AdapterState::default()),
            listeners: Arc::new(RangeListeners::default()),
            sync_driven: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.state).mounted.is_some()
    }

    pub fn is_sync_driven(&self) -> bool {
        self.sync_driven.load(Ordering::SeqCst)
    }

    pub fn candles(&self) -> Option<Arc<[Candle]>> {
        lock(&self.state).candles.clone()
    }

    pub fn overlay_ids(&self) -> Vec<String> {
        lock(&self.state).overlays.keys().cloned().collect()
    }

    pub fn overlay(&self, id: &str) -> Option<IndicatorSeries> {
        lock(&self.state).overlays.get(id).map(|o| o.series.clone())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }

    /// Create the surface in `container`. Any previous surface is released
    /// first; data and overlays applied earlier are replayed onto the new one.
    pub fn initialize(
        &self,
        container: &Container,
        options: &SurfaceOptions,
    ) -> Result<(), SurfaceError> {
        let previous = lock(&self.state).mounted.take();
        if let Some(previous) = previous {
            release(previous);
            debug!(adapter = %self.name, "released previous surface before re-initializing");
        }
        self.listeners.reset();

        let surface = self.backend.create_surface(container, options)?;
        let listeners = Arc::downgrade(&self.listeners);
        let forwarder = surface.subscribe_visible_range_change(forwarder(listeners));

        let mounted = match self.add_primary(&surface, options, forwarder) {
            Ok(mounted) => mounted,
            Err(err) => {
                surface.unsubscribe_visible_range_change(forwarder);
                surface.remove();
                return Err(err);
            }
        };

        let should_fit = {
            let mut state = lock(&self.state);
            state.mounted = Some(mounted);
            if let Err(err) = render_all(&mut state) {
                if let Some(mounted) = state.mounted.take() {
                    release(mounted);
                }
                return Err(err);
            }
            state.candles.is_some()
        };

        info!(
            adapter = %self.name,
            container = %container.id,
            pane = ?self.pane,
            "chart surface initialized"
        );

        if should_fit && !self.is_sync_driven() {
            self.fit();
        }
        Ok(())
    }

    fn add_primary(
        &self,
        surface: &Arc<dyn RenderSurface>,
        options: &SurfaceOptions,
        forwarder: SubscriberId,
    ) -> Result<MountedSurface, SurfaceError> {
        let (primary, primary_kind, volume) = match self.pane {
            Pane::Price => {
                let candles = surface.add_series(
                    SeriesKind::Candlestick,
                    SeriesStyle::plain(self.name.clone()),
                )?;
                let volume = if options.volume_histogram {
                    let style = SeriesStyle::plain("Volume").on_scale(VOLUME_SCALE);
                    Some(surface.add_series(SeriesKind::Histogram, style)?)
                } else {
                    None
                };
                (candles, SeriesKind::Candlestick, volume)
            }
            Pane::Oscillator => {
                let timeline = surface.add_series(
                    SeriesKind::Whitespace,
                    SeriesStyle::plain(format!("{} timeline", self.name)),
                )?;
                (timeline, SeriesKind::Whitespace, None)
            }
        };

        Ok(MountedSurface {
            surface: surface.clone(),
            forwarder,
            primary,
            primary_kind,
            volume,
            overlay_series: HashMap::new(),
        })
    }

    /// Replace the primary content wholesale and rebuild indicator overlays.
    /// Fits the time scale afterwards unless a synchronizer drives it.
    pub fn set_primary_data(&self, candles: Arc<[Candle]>) -> Result<(), SurfaceError> {
        {
            let mut state = lock(&self.state);
            if state.mounted.is_none() {
                return Err(SurfaceError::NotInitialized);
            }
            state.candles = Some(candles.clone());
            rebuild_indicator_overlays(&mut state);
            render_all(&mut state)?;
        }

        debug!(adapter = %self.name, candles = candles.len(), "primary data replaced");

        if !self.is_sync_driven() {
            self.fit();
        }
        Ok(())
    }

    /// Store the adapter's indicator configs; only configs for this pane
    /// that are visible get drawn.
    pub fn apply_indicators(&self, configs: &[IndicatorConfig]) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.indicators = configs_for_pane(configs, self.pane);
        rebuild_indicator_overlays(&mut state);
        render_all(&mut state)
    }

    /// Horizontal guides drawn on oscillator overlays.
    pub fn set_guide_levels(&self, levels: Vec<PriceLevel>) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.guide_levels = levels;
        let guides = state.guide_levels.clone();
        for overlay in state.overlays.values_mut() {
            if overlay.owner == OverlayOwner::Indicator && self.pane == Pane::Oscillator {
                overlay.price_lines = guides.clone();
            }
        }
        render_all(&mut state)
    }

    /// Replace the annotation lines drawn on the primary series.
    pub fn set_annotations(&self, levels: Vec<PriceLevel>) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.annotations = levels;
        render_all(&mut state)
    }

    /// MAX/MIN markers, recomputed whenever the primary data changes.
    pub fn set_range_markers(&self, markers: RangeMarkers) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.range_markers = markers;
        render_all(&mut state)
    }

    /// Lines currently drawn (or to be drawn) on the primary series.
    pub fn primary_price_lines(&self) -> Vec<PriceLevel> {
        lock(&self.state).primary_lines()
    }

    /// Add or replace overlay `id`. An empty series removes the overlay.
    pub fn set_overlay(
        &self,
        id: impl Into<String>,
        series: IndicatorSeries,
        style: SeriesStyle,
    ) -> Result<(), SurfaceError> {
        let id = id.into();
        let mut state = lock(&self.state);
        if series.is_empty() {
            state.overlays.remove(&id);
        } else {
            state.overlays.insert(
                id,
                Overlay {
                    series,
                    style,
                    price_lines: Vec::new(),
                    owner: OverlayOwner::Manual,
                },
            );
        }
        render_all(&mut state)
    }

    pub fn remove_overlay(&self, id: &str) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        if state.overlays.remove(id).is_none() {
            return Ok(());
        }
        render_all(&mut state)
    }

    pub fn visible_range(&self) -> Option<VisibleRange> {
        self.surface().and_then(|surface| surface.visible_range())
    }

    /// Move the time scale. Without data this is a silent no-op.
    pub fn set_visible_range(
        &self,
        range: VisibleRange,
        origin: RangeOrigin,
    ) -> Result<(), SurfaceError> {
        let surface = {
            let state = lock(&self.state);
            let Some(mounted) = state.mounted.as_ref() else {
                return Err(SurfaceError::NotInitialized);
            };
            if state.candles.as_ref().map_or(true, |c| c.is_empty()) {
                debug!(adapter = %self.name, "no data yet, visible range left unchanged");
                return Ok(());
            }
            mounted.surface.clone()
        };

        match origin {
            RangeOrigin::Sync => {
                let _guard = Suppress::new(&self.listeners.suppressed);
                surface.set_visible_range(range)
            }
            RangeOrigin::User | RangeOrigin::Program => surface.set_visible_range(range),
        }
    }

    /// Listen for visible range changes. Identical consecutive ranges are
    /// reported once; ranges applied by a synchronizer are not reported.
    pub fn on_visible_range_changed(
        &self,
        callback: RangeCallback,
    ) -> Result<RangeSubscription, SurfaceError> {
        if !self.is_initialized() {
            return Err(SurfaceError::NotInitialized);
        }
        let id = self.listeners.add(callback);
        let listeners = Arc::downgrade(&self.listeners);
        Ok(RangeSubscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.remove(id);
            }
        }))
    }

    /// Release the surface and everything attached to it. Safe to call twice.
    pub fn dispose(&self) {
        let mounted = {
            let mut state = lock(&self.state);
            state.candles = None;
            state.overlays.clear();
            state.mounted.take()
        };
        lock(&self.listeners.callbacks).clear();
        self.listeners.reset();

        if let Some(mounted) = mounted {
            release(mounted);
            info!(adapter = %self.name, "chart surface disposed");
        }
    }

    fn surface(&self) -> Option<Arc<dyn RenderSurface>> {
        lock(&self.state)
            .mounted
            .as_ref()
            .map(|mounted| mounted.surface.clone())
    }

    fn fit(&self) {
        if let Some(surface) = self.surface() {
            surface.fit_content();
        }
    }
}

impl Drop for ChartSurfaceAdapter {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl TimeScale for ChartSurfaceAdapter {
    fn label(&self) -> &str {
        &self.name
    }

    fn current_range(&self) -> Result<Option<VisibleRange>, SurfaceError> {
        if !self.is_initialized() {
            return Err(SurfaceError::NotInitialized);
        }
        Ok(self.visible_range())
    }

    fn apply_range(&self, range: VisibleRange, origin: RangeOrigin) -> Result<(), SurfaceError> {
        self.set_visible_range(range, origin)
    }

    fn watch_range(&self, callback: RangeCallback) -> Result<RangeSubscription, SurfaceError> {
        self.on_visible_range_changed(callback)
    }

    fn set_sync_driven(&self, driven: bool) {
        self.sync_driven.store(driven, Ordering::SeqCst);
    }
}

fn forwarder(listeners: Weak<RangeListeners>) -> RangeCallback {
    Arc::new(move |range| {
        if let Some(listeners) = listeners.upgrade() {
            listeners.dispatch(range);
        }
    })
}

fn release(mounted: MountedSurface) {
    mounted
        .surface
        .unsubscribe_visible_range_change(mounted.forwarder);
    mounted.surface.remove();
}

fn rebuild_indicator_overlays(state: &mut AdapterState) {
    state
        .overlays
        .retain(|_, overlay| overlay.owner != OverlayOwner::Indicator);

    let Some(candles) = state.candles.clone() else {
        return;
    };

    for config in state.indicators.iter().filter(|config| config.visible) {
        let series = compute(config, &candles);
        if series.is_empty() {
            debug!(
                indicator = %config.title(),
                kind = config.kind.name(),
                candles = candles.len(),
                "not enough candles, overlay skipped"
            );
            continue;
        }
        let price_lines = if config.kind == IndicatorKind::Rsi {
            state.guide_levels.clone()
        } else {
            Vec::new()
        };
        let mut style = SeriesStyle::line(config.title(), config.effective_color());
        if config.kind == IndicatorKind::VolumeMa {
            style = style.on_scale(VOLUME_SCALE);
        }
        style.last_value_visible = config.kind == IndicatorKind::Rsi;
        state.overlays.insert(
            config.id.clone(),
            Overlay {
                series,
                style,
                price_lines,
                owner: OverlayOwner::Indicator,
            },
        );
    }
}

/// Push primary data and overlays onto the mounted surface, if any.
fn render_all(state: &mut AdapterState) -> Result<(), SurfaceError> {
    let primary_lines = state.primary_lines();
    let AdapterState {
        mounted,
        candles,
        overlays,
        ..
    } = state;
    let Some(mounted) = mounted.as_mut() else {
        return Ok(());
    };

    if let Some(candles) = candles {
        render_primary(mounted, candles)?;
    }
    mounted.surface.set_price_lines(mounted.primary, &primary_lines)?;

    let stale: Vec<String> = mounted
        .overlay_series
        .keys()
        .filter(|id| !overlays.contains_key(*id))
        .cloned()
        .collect();
    for id in stale {
        if let Some((series, _)) = mounted.overlay_series.remove(&id) {
            mounted.surface.remove_series(series)?;
        }
    }

    for (id, overlay) in overlays.iter() {
        let current = mounted.overlay_series.get(id).cloned();
        let series = match current {
            Some((series, style)) if style == overlay.style => series,
            existing => {
                if let Some((old, _)) = existing {
                    mounted.surface.remove_series(old)?;
                }
                let series = mounted
                    .surface
                    .add_series(SeriesKind::Line, overlay.style.clone())?;
                mounted
                    .overlay_series
                    .insert(id.clone(), (series, overlay.style.clone()));
                series
            }
        };
        mounted
            .surface
            .set_series_data(series, SeriesData::Line(overlay.series.points.clone()))?;
        mounted.surface.set_price_lines(series, &overlay.price_lines)?;
    }
    Ok(())
}

fn render_primary(mounted: &MountedSurface, candles: &Arc<[Candle]>) -> Result<(), SurfaceError> {
    let data = match mounted.primary_kind {
        SeriesKind::Whitespace => SeriesData::Whitespace(candles.iter().map(|c| c.time).collect()),
        _ => SeriesData::Candles(candles.clone()),
    };
    mounted.surface.set_series_data(mounted.primary, data)?;

    let Some(volume) = mounted.volume else {
        return Ok(());
    };
    let bars = candles
        .iter()
        .filter_map(|candle| {
            let color = if candle.is_bullish() { VOLUME_UP } else { VOLUME_DOWN };
            candle.volume.map(|value| HistogramBar {
                time: candle.time,
                value,
                color: color.to_string(),
            })
        })
        .collect();
    mounted
        .surface
        .set_series_data(volume, SeriesData::Histogram(bars))
}
