//! Unit tests for the chart surface adapter

use std::sync::{Arc, Mutex};
use traderoad::indicators::Pane;
use traderoad::models::{
    Candle, IndicatorConfig, IndicatorSeries, LineStyle, PriceLevel, RangeMarkers, RsiPanelConfig,
    VisibleRange,
};
use traderoad::surface::{
    ChartSurfaceAdapter, Container, HeadlessBackend, SeriesData, SeriesStyle, SurfaceError,
    SurfaceOptions,
};
use traderoad::sync::{RangeOrigin, TimeScale};

fn create_test_candles(count: usize) -> Arc<[Candle]> {
    (0..count)
        .map(|i| {
            let price = 100.0 + (i as f64 * 0.2).sin() * 3.0;
            Candle::new(1_700_000_000 + i as i64 * 3600, price, price + 1.0, price - 1.0, price + 0.3)
                .with_volume(500.0 + i as f64)
        })
        .collect::<Vec<_>>()
        .into()
}

fn price_adapter(backend: &Arc<HeadlessBackend>) -> ChartSurfaceAdapter {
    let adapter = ChartSurfaceAdapter::new("main", Pane::Price, backend.clone());
    adapter
        .initialize(&Container::new("main", 1200, 600), &SurfaceOptions::default())
        .unwrap();
    adapter
}

fn recorder() -> (Arc<Mutex<Vec<VisibleRange>>>, Arc<dyn Fn(VisibleRange) + Send + Sync>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Arc::new(move |range: VisibleRange| sink.lock().unwrap().push(range)))
}

#[test]
fn test_initialize_on_detached_container_fails() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = ChartSurfaceAdapter::new("main", Pane::Price, backend.clone());
    let result = adapter.initialize(&Container::new("main", 10, 10).detached(), &SurfaceOptions::default());
    assert!(matches!(result, Err(SurfaceError::Init { .. })));
    assert!(!adapter.is_initialized());
}

#[test]
fn test_primary_data_requires_initialization() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = ChartSurfaceAdapter::new("main", Pane::Price, backend);
    assert_eq!(
        adapter.set_primary_data(create_test_candles(10)),
        Err(SurfaceError::NotInitialized)
    );
}

#[test]
fn test_price_pane_draws_candles_volume_and_moving_averages() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.apply_indicators(&IndicatorConfig::defaults()).unwrap();
    adapter.set_primary_data(create_test_candles(250)).unwrap();

    assert_eq!(adapter.overlay_ids(), vec!["ma1", "ma2", "ma3", "ma4", "volume_ma"]);

    let surface = backend.surface_for("main").unwrap();
    let ema12 = surface.series_titled("EMA12").unwrap();
    assert_eq!(ema12.data.len(), 250 - 12 + 1);
    let volume = surface.series_titled("Volume").unwrap();
    assert!(matches!(volume.data, SeriesData::Histogram(ref bars) if bars.len() == 250));
    let vol_ma = surface.series_titled("VolMA55").unwrap();
    assert_eq!(vol_ma.style.price_scale_id.as_deref(), Some("volume_scale"));

    assert_eq!(
        adapter.visible_range(),
        Some(VisibleRange::new(1_700_000_000, 1_700_000_000 + 249 * 3600))
    );
}

#[test]
fn test_short_history_skips_long_overlays() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.apply_indicators(&IndicatorConfig::defaults()).unwrap();
    adapter.set_primary_data(create_test_candles(100)).unwrap();

    let ids = adapter.overlay_ids();
    assert!(ids.contains(&"ma3".to_string()));
    assert!(!ids.contains(&"ma4".to_string()));
    assert!(backend.surface_for("main").unwrap().series_titled("MA200").is_none());
}

#[test]
fn test_oscillator_draws_rsi_with_guides() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = ChartSurfaceAdapter::new("rsi", Pane::Oscillator, backend.clone());
    adapter
        .initialize(&Container::new("rsi", 1200, 150), &SurfaceOptions::default().for_oscillator(150))
        .unwrap();
    adapter.apply_indicators(&IndicatorConfig::defaults()).unwrap();
    adapter.set_guide_levels(RsiPanelConfig::default().guide_levels()).unwrap();
    adapter.set_primary_data(create_test_candles(60)).unwrap();

    assert_eq!(adapter.overlay_ids(), vec!["rsi"]);
    let surface = backend.surface_for("rsi").unwrap();
    let rsi = surface.series_titled("RSI14").unwrap();
    assert_eq!(rsi.data.len(), 60 - 14);
    assert_eq!(rsi.price_lines.len(), 3);
    assert!(surface.series_titled("Volume").is_none());
}

#[test]
fn test_reinitialize_releases_previous_surface_and_replays() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.apply_indicators(&IndicatorConfig::defaults()).unwrap();
    adapter.set_primary_data(create_test_candles(60)).unwrap();

    adapter
        .initialize(&Container::new("main", 1200, 600), &SurfaceOptions::default())
        .unwrap();

    let surfaces = backend.surfaces();
    assert_eq!(surfaces.len(), 2);
    assert!(surfaces[0].is_removed());
    assert_eq!(surfaces[0].subscriber_count(), 0);
    assert!(!surfaces[1].is_removed());
    assert_eq!(surfaces[1].series_titled("EMA12").unwrap().data.len(), 60 - 12 + 1);
    assert!(adapter.visible_range().is_some());
}

#[test]
fn test_range_listener_dedupes_identical_ranges() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.set_primary_data(create_test_candles(50)).unwrap();
    let (seen, callback) = recorder();
    let _subscription = adapter.on_visible_range_changed(callback).unwrap();

    let range = VisibleRange::new(1_700_000_000 + 10 * 3600, 1_700_000_000 + 30 * 3600);
    adapter.set_visible_range(range, RangeOrigin::User).unwrap();
    adapter.set_visible_range(range, RangeOrigin::User).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![range]);
}

#[test]
fn test_sync_origin_is_not_reported() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.set_primary_data(create_test_candles(50)).unwrap();
    let (seen, callback) = recorder();
    let _subscription = adapter.on_visible_range_changed(callback).unwrap();

    let synced = VisibleRange::new(1_700_000_000 + 5 * 3600, 1_700_000_000 + 20 * 3600);
    adapter.set_visible_range(synced, RangeOrigin::Sync).unwrap();
    assert_eq!(adapter.visible_range(), Some(synced));
    assert!(seen.lock().unwrap().is_empty());

    let panned = synced.shifted(3600);
    backend.surface_for("main").unwrap().scroll_by(3600).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![panned]);
}

#[test]
fn test_set_visible_range_without_data_is_silent() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter
        .set_visible_range(VisibleRange::new(1, 2), RangeOrigin::Program)
        .unwrap();
    assert_eq!(adapter.visible_range(), None);
}

#[test]
fn test_sync_driven_adapter_does_not_autofit() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.set_sync_driven(true);
    adapter.set_primary_data(create_test_candles(20)).unwrap();
    assert_eq!(adapter.visible_range(), None);
}

#[test]
fn test_empty_overlay_is_removed() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.set_primary_data(create_test_candles(20)).unwrap();

    let series: IndicatorSeries = create_test_candles(20)
        .iter()
        .map(|c| traderoad::models::IndicatorPoint::new(c.time, c.close))
        .collect();
    adapter
        .set_overlay("custom", series, SeriesStyle::line("Custom", "#FFFFFF"))
        .unwrap();
    assert!(backend.surface_for("main").unwrap().series_titled("Custom").is_some());

    adapter
        .set_overlay("custom", IndicatorSeries::empty(), SeriesStyle::line("Custom", "#FFFFFF"))
        .unwrap();
    assert!(adapter.overlay("custom").is_none());
    assert!(backend.surface_for("main").unwrap().series_titled("Custom").is_none());
}

#[test]
fn test_subscription_drop_unsubscribes() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    let (_, callback) = recorder();
    let subscription = adapter.on_visible_range_changed(callback).unwrap();
    assert_eq!(adapter.listener_count(), 1);
    drop(subscription);
    assert_eq!(adapter.listener_count(), 0);
}

#[test]
fn test_dispose_is_idempotent() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.set_primary_data(create_test_candles(20)).unwrap();
    let (_, callback) = recorder();
    let _subscription = adapter.on_visible_range_changed(callback).unwrap();

    adapter.dispose();
    adapter.dispose();

    assert!(!adapter.is_initialized());
    assert_eq!(adapter.listener_count(), 0);
    assert_eq!(backend.live_surfaces(), 0);
    assert_eq!(adapter.current_range(), Err(SurfaceError::NotInitialized));
}

#[test]
fn test_remove_overlay_drops_series() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    adapter.set_primary_data(create_test_candles(20)).unwrap();
    let surface = backend.surface_for("main").unwrap();
    let before = surface.series_count();

    let series: IndicatorSeries = create_test_candles(20)
        .iter()
        .map(|c| traderoad::models::IndicatorPoint::new(c.time, c.open))
        .collect();
    adapter
        .set_overlay("opens", series, SeriesStyle::line("Opens", "#FFFFFF"))
        .unwrap();
    assert_eq!(surface.series_count(), before + 1);

    adapter.remove_overlay("opens").unwrap();
    adapter.remove_overlay("opens").unwrap();

    assert_eq!(surface.series_count(), before);
    assert!(adapter.overlay("opens").is_none());
}

#[test]
fn test_explicit_unsubscribe() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    let (_, callback) = recorder();
    let subscription = adapter.on_visible_range_changed(callback).unwrap();

    subscription.unsubscribe();

    assert_eq!(adapter.listener_count(), 0);
}

#[test]
fn test_annotations_and_range_markers_on_primary_series() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = price_adapter(&backend);
    let candles = create_test_candles(40);
    adapter.set_primary_data(candles.clone()).unwrap();
    adapter
        .set_annotations(vec![PriceLevel::new(101.0, "#FFFFFF", LineStyle::Solid).with_title("Entry")])
        .unwrap();
    adapter
        .set_range_markers(RangeMarkers {
            visible: true,
            ..RangeMarkers::default()
        })
        .unwrap();

    let primary = backend.surface_for("main").unwrap().series_titled("main").unwrap();
    let titles: Vec<Option<String>> = primary.price_lines.iter().map(|l| l.title.clone()).collect();
    assert_eq!(primary.price_lines.len(), 3);
    assert_eq!(titles[0].as_deref(), Some("Entry"));
    assert!(titles[1].as_deref().unwrap().starts_with("MAX: "));
    assert!(titles[2].as_deref().unwrap().starts_with("MIN: "));

    let max = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    assert_eq!(primary.price_lines[1].price, max);
    assert_eq!(primary.price_lines[1].color, "#88888899");
    assert_eq!(adapter.primary_price_lines(), primary.price_lines);
}

#[test]
fn test_annotations_replay_on_reinitialize() {
    let backend = Arc::new(HeadlessBackend::new());
    let adapter = ChartSurfaceAdapter::new("main", Pane::Price, backend.clone());
    adapter
        .set_annotations(vec![PriceLevel::new(100.0, "#FFFFFF", LineStyle::Dashed)])
        .unwrap();

    adapter
        .initialize(&Container::new("main", 1200, 600), &SurfaceOptions::default())
        .unwrap();
    adapter
        .initialize(&Container::new("main", 1200, 600), &SurfaceOptions::default())
        .unwrap();

    let surfaces = backend.surfaces();
    assert_eq!(surfaces.len(), 2);
    let primary = surfaces[1].series_titled("main").unwrap();
    assert_eq!(primary.price_lines.len(), 1);

    adapter.set_annotations(Vec::new()).unwrap();
    assert!(surfaces[1].series_titled("main").unwrap().price_lines.is_empty());
}
