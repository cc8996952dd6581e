//! TradeRoad headless dashboard
//!
//! Loads candles from the configured provider into an in-memory chart pair,
//! logs the latest indicator values, pans the main chart and reports the
//! RSI panel's synchronized window.

use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use traderoad::config::{get_environment, DashboardConfig};
use traderoad::dashboard::{DashboardController, LoadOutcome};
use traderoad::logging;
use traderoad::surface::{Container, HeadlessBackend, SurfaceOptions};
use traderoad::sync::SyncState;

const MAIN_CONTAINER: &str = "main-chart";
const RSI_CONTAINER: &str = "rsi-panel";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = DashboardConfig::from_env();
    info!(environment = %get_environment(), "Starting TradeRoad headless dashboard");
    info!(
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        provider = config.provider.label(),
        limit = config.candle_limit,
        "Configuration"
    );

    let backend = Arc::new(HeadlessBackend::new());
    let mut dashboard = DashboardController::from_config(&config, backend.clone())?;
    dashboard.mount(
        Container::new(MAIN_CONTAINER, 1200, 600),
        Container::new(RSI_CONTAINER, 1200, 150),
        SurfaceOptions::default(),
    )?;

    match dashboard.load().await? {
        LoadOutcome::Loaded { candles } => info!(candles, "Chart data ready"),
        LoadOutcome::NoData => {
            warn!("Provider returned no candles, nothing to show");
            dashboard.unmount();
            return Ok(());
        }
    }

    if let Some(candles) = dashboard.candles() {
        let first = candles.first().and_then(|c| c.datetime());
        let last = candles.last().and_then(|c| c.datetime());
        if let (Some(first), Some(last)) = (first, last) {
            info!(from = %first.to_rfc3339(), to = %last.to_rfc3339(), "Loaded window");
        }
    }
    if let Some(quote) = dashboard.latest_quote() {
        info!(
            price = quote.price,
            volume = ?quote.volume,
            change_percent = ?quote.change_percent,
            "Latest quote"
        );
    }
    for id in dashboard.main().overlay_ids() {
        if let Some(last) = dashboard.main().overlay(&id).and_then(|s| s.last().copied()) {
            info!(overlay = %id, time = last.time, value = last.value, "Price overlay");
        }
    }
    for id in dashboard.oscillator().overlay_ids() {
        if let Some(last) = dashboard.oscillator().overlay(&id).and_then(|s| s.last().copied()) {
            info!(overlay = %id, time = last.time, value = last.value, "Oscillator overlay");
        }
    }

    let mut state = dashboard.synchronizer().subscribe_state();
    let attached = tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| matches!(s, SyncState::Attached | SyncState::Failed)),
    )
    .await
    .ok()
    .and_then(|waited| waited.ok().map(|s| *s == SyncState::Attached))
    .unwrap_or(false);
    if !attached {
        warn!(state = %dashboard.sync_state(), "Charts are not synchronized, skipping pan");
        dashboard.unmount();
        return Ok(());
    }

    if let (Some(surface), Some(range)) = (
        backend.surface_for(MAIN_CONTAINER),
        dashboard.main().visible_range(),
    ) {
        let pan = -(range.span() / 4);
        surface.scroll_by(pan)?;
        info!(from = %range, to = ?dashboard.main().visible_range(), "Panned main chart");

        tokio::time::sleep(config.sync.debounce + Duration::from_millis(100)).await;
        info!(
            main = ?dashboard.main().visible_range(),
            rsi = ?dashboard.oscillator().visible_range(),
            stats = ?dashboard.sync_stats(),
            "Synchronized window"
        );
    }

    dashboard.unmount();
    info!("Shutdown complete");
    Ok(())
}
