//! Unit tests for the in-memory surface backend

use std::sync::{Arc, Mutex};
use traderoad::models::{Candle, VisibleRange};
use traderoad::surface::{
    Container, HeadlessBackend, RenderSurface, SeriesData, SeriesKind, SeriesStyle, SurfaceBackend,
    SurfaceError, SurfaceOptions,
};

fn candles(count: i64) -> Arc<[Candle]> {
    (0..count)
        .map(|i| Candle::new(1_000 + i * 60, 1.0, 2.0, 0.5, 1.5))
        .collect::<Vec<_>>()
        .into()
}

fn surface_with_data(backend: &HeadlessBackend) -> Arc<dyn RenderSurface> {
    let surface = backend
        .create_surface(&Container::new("chart", 800, 400), &SurfaceOptions::default())
        .unwrap();
    let series = surface
        .add_series(SeriesKind::Candlestick, SeriesStyle::plain("candles"))
        .unwrap();
    surface.set_series_data(series, SeriesData::Candles(candles(10))).unwrap();
    surface
}

#[test]
fn test_detached_container_fails_init() {
    let backend = HeadlessBackend::new();
    let result = backend.create_surface(&Container::new("chart", 800, 400).detached(), &SurfaceOptions::default());
    assert!(matches!(result, Err(SurfaceError::Init { .. })));
    assert!(backend.surfaces().is_empty());
}

#[test]
fn test_fit_content_covers_data_and_notifies_once() {
    let backend = HeadlessBackend::new();
    let surface = surface_with_data(&backend);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    surface.subscribe_visible_range_change(Arc::new(move |r: VisibleRange| sink.lock().unwrap().push(r)));

    surface.fit_content();
    surface.fit_content();

    assert_eq!(surface.visible_range(), Some(VisibleRange::new(1_000, 1_540)));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_set_visible_range_clamps_to_data() {
    let backend = HeadlessBackend::new();
    let surface = surface_with_data(&backend);
    surface.set_visible_range(VisibleRange::new(0, 1_200)).unwrap();
    assert_eq!(surface.visible_range(), Some(VisibleRange::new(1_000, 1_200)));
}

#[test]
fn test_set_visible_range_without_data_is_noop() {
    let backend = HeadlessBackend::new();
    let surface = backend
        .create_surface(&Container::new("empty", 800, 400), &SurfaceOptions::default())
        .unwrap();
    surface.set_visible_range(VisibleRange::new(0, 10)).unwrap();
    assert_eq!(surface.visible_range(), None);
}

#[test]
fn test_removed_surface_rejects_calls() {
    let backend = HeadlessBackend::new();
    let surface = surface_with_data(&backend);
    surface.remove();
    surface.remove();

    assert_eq!(
        surface.add_series(SeriesKind::Line, SeriesStyle::plain("late")),
        Err(SurfaceError::Disposed)
    );
    assert_eq!(backend.live_surfaces(), 0);
    assert!(backend.surface_for("chart").unwrap().is_removed());
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let backend = HeadlessBackend::new();
    let surface = surface_with_data(&backend);
    let seen = Arc::new(Mutex::new(0));
    let sink = seen.clone();
    let id = surface.subscribe_visible_range_change(Arc::new(move |_: VisibleRange| *sink.lock().unwrap() += 1));
    surface.unsubscribe_visible_range_change(id);

    surface.fit_content();
    assert_eq!(*seen.lock().unwrap(), 0);
    assert_eq!(backend.surface_for("chart").unwrap().subscriber_count(), 0);
}
