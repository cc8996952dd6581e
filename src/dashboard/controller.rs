//! Dashboard controller: owns the selection, the candle snapshot and the
//! chart pair, and wires the synchronizer between the two charts.

use super::selection::{LoadOutcome, LoadStatus, Quote, Selection};
use crate::config::DashboardConfig;
use crate::indicators::{validate_candles, validate_configs, validate_period, IndicatorError, Pane};
use crate::models::{
    AnalysisDisplay, Candle, ChartAnalysis, IndicatorConfig, IndicatorKind, PriceLevel,
    RangeMarkers, RsiPanelConfig,
};
use crate::services::{build_gateways, DataSource, DataUnavailableError, GatewayMap, MarketDataGateway, Timeframe};
use crate::surface::{ChartSurfaceAdapter, Container, SurfaceBackend, SurfaceError, SurfaceOptions};
use crate::sync::{SyncError, SyncState, SyncStats, TimeScale, TimeWindowSynchronizer};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Data(#[from] DataUnavailableError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Debug, Clone)]
struct MountPoints {
    main: Container,
    oscillator: Container,
    options: SurfaceOptions,
}

pub struct DashboardController {
    selection: Selection,
    candle_limit: usize,
    gateways: GatewayMap,
    candles: Option<Arc<[Candle]>>,
    indicators: Vec<IndicatorConfig>,
    rsi_panel: RsiPanelConfig,
    analysis: Option<ChartAnalysis>,
    analysis_display: AnalysisDisplay,
    range_markers: RangeMarkers,
    main: Arc<ChartSurfaceAdapter>,
    oscillator: Arc<ChartSurfaceAdapter>,
    synchronizer: TimeWindowSynchronizer,
    mount: Option<MountPoints>,
    status: LoadStatus,
}

impl DashboardController {
    /// Controller without gateways; register them with [`Self::with_gateway`].
    pub fn new(config: &DashboardConfig, backend: Arc<dyn SurfaceBackend>) -> Self {
        Self {
            selection: Selection::from(config),
            candle_limit: config.candle_limit,
            gateways: GatewayMap::new(),
            candles: None,
            indicators: IndicatorConfig::defaults(),
            rsi_panel: RsiPanelConfig::default(),
            analysis: None,
            analysis_display: AnalysisDisplay::default(),
            range_markers: RangeMarkers::default(),
            main: Arc::new(ChartSurfaceAdapter::new("main", Pane::Price, backend.clone())),
            oscillator: Arc::new(ChartSurfaceAdapter::new("rsi", Pane::Oscillator, backend)),
            synchronizer: TimeWindowSynchronizer::new(config.sync),
            mount: None,
            status: LoadStatus::Idle,
        }
    }

    /// Controller with the HTTP gateways for every supported provider.
    pub fn from_config(
        config: &DashboardConfig,
        backend: Arc<dyn SurfaceBackend>,
    ) -> Result<Self, ControllerError> {
        let mut controller = Self::new(config, backend);
        controller.gateways = build_gateways(config)?;
        Ok(controller)
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn MarketDataGateway>) -> Self {
        self.gateways.insert(gateway.source(), gateway);
        self
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn candles(&self) -> Option<Arc<[Candle]>> {
        self.candles.clone()
    }

    pub fn indicators(&self) -> &[IndicatorConfig] {
        &self.indicators
    }

    pub fn rsi_panel(&self) -> &RsiPanelConfig {
        &self.rsi_panel
    }

    pub fn analysis(&self) -> Option<&ChartAnalysis> {
        self.analysis.as_ref()
    }

    pub fn main(&self) -> &Arc<ChartSurfaceAdapter> {
        &self.main
    }

    pub fn oscillator(&self) -> &Arc<ChartSurfaceAdapter> {
        &self.oscillator
    }

    pub fn synchronizer(&self) -> &TimeWindowSynchronizer {
        &self.synchronizer
    }

    pub fn sync_state(&self) -> SyncState {
        self.synchronizer.state()
    }

    pub fn sync_stats(&self) -> SyncStats {
        self.synchronizer.stats()
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_some()
    }

    /// Create both surfaces, then start synchronizing the RSI panel to the
    /// main chart. Must run inside a Tokio runtime.
    pub fn mount(
        &mut self,
        main: Container,
        oscillator: Container,
        options: SurfaceOptions,
    ) -> Result<(), ControllerError> {
        self.synchronizer.teardown();

        self.main.initialize(&main, &options)?;
        self.oscillator
            .initialize(&oscillator, &options.for_oscillator(oscillator.height))?;

        self.main.apply_indicators(&self.indicators)?;
        self.oscillator.apply_indicators(&self.indicators)?;
        self.oscillator
            .set_guide_levels(self.rsi_panel.guide_levels())?;
        self.main.set_range_markers(self.range_markers.clone())?;
        self.main.set_annotations(self.analysis_levels())?;

        if let Some(candles) = self.candles.clone() {
            self.push_candles(&candles)?;
        }

        self.mount = Some(MountPoints {
            main,
            oscillator,
            options,
        });
        self.attach_sync()?;

        info!(selection = %self.selection, "dashboard mounted");
        Ok(())
    }

    fn attach_sync(&self) -> Result<(), SyncError> {
        let driving: Weak<ChartSurfaceAdapter> = Arc::downgrade(&self.main);
        let follower: Weak<ChartSurfaceAdapter> = Arc::downgrade(&self.oscillator);
        let driving: Weak<dyn TimeScale> = driving;
        let follower: Weak<dyn TimeScale> = follower;
        self.synchronizer.attach(driving, follower)
    }

    /// Fetch candles for the current selection and hand them to both charts.
    ///
    /// On failure the status becomes [`LoadStatus::Error`] and the charts keep
    /// whatever they showed before. An empty answer leaves them untouched too.
    pub async fn load(&mut self) -> Result<LoadOutcome, ControllerError> {
        self.status = LoadStatus::Loading;

        let fetched = match self.fetch().await {
            Ok(fetched) => fetched,
            Err(err) => return Err(self.fail_load(err)),
        };

        if fetched.is_empty() {
            info!(selection = %self.selection, "provider returned no candles");
            self.status = LoadStatus::NoData;
            return Ok(LoadOutcome::NoData);
        }

        let count = fetched.len();
        let candles: Arc<[Candle]> = Arc::from(fetched);
        if self.mount.is_some() {
            if let Err(err) = self.push_candles(&candles) {
                return Err(self.fail_load(err.into()));
            }
        }
        self.candles = Some(candles);

        info!(selection = %self.selection, candles = count, "candles loaded");
        self.status = LoadStatus::Ready { candles: count };
        Ok(LoadOutcome::Loaded { candles: count })
    }

    fn push_candles(&self, candles: &Arc<[Candle]>) -> Result<(), SurfaceError> {
        self.main.set_primary_data(candles.clone())?;
        self.oscillator.set_primary_data(candles.clone())
    }

    fn fail_load(&mut self, err: ControllerError) -> ControllerError {
        warn!(selection = %self.selection, error = %err, "candle load failed");
        self.status = LoadStatus::Error {
            message: err.to_string(),
        };
        err
    }

    async fn fetch(&self) -> Result<Vec<Candle>, ControllerError> {
        let source = self.selection.source;
        let gateway = self
            .gateways
            .get(&source)
            .cloned()
            .ok_or(DataUnavailableError::UnknownProvider(source))?;
        let candles = gateway
            .fetch_candles(&self.selection.symbol, self.selection.timeframe, self.candle_limit)
            .await?;
        validate_candles(&candles)?;
        Ok(candles)
    }

    /// Switch instrument: surfaces are rebuilt from scratch, then reloaded.
    pub async fn select_symbol(
        &mut self,
        symbol: impl Into<String>,
    ) -> Result<LoadOutcome, ControllerError> {
        self.selection.symbol = symbol.into();
        self.remount()?;
        self.load().await
    }

    /// Switch provider: surfaces are rebuilt from scratch, then reloaded.
    pub async fn select_provider(
        &mut self,
        source: DataSource,
    ) -> Result<LoadOutcome, ControllerError> {
        self.selection.source = source;
        self.remount()?;
        self.load().await
    }

    /// Switch interval; surfaces are kept.
    pub async fn select_timeframe(
        &mut self,
        timeframe: Timeframe,
    ) -> Result<LoadOutcome, ControllerError> {
        self.selection.timeframe = timeframe;
        self.load().await
    }

    fn remount(&mut self) -> Result<(), ControllerError> {
        self.synchronizer.teardown();
        self.main.dispose();
        self.oscillator.dispose();
        self.candles = None;
        self.status = LoadStatus::Idle;

        match self.mount.take() {
            Some(points) => self.mount(points.main, points.oscillator, points.options),
            None => Ok(()),
        }
    }

    /// Replace the overlay configs. Invalid periods are rejected before
    /// anything is redrawn.
    pub fn set_indicators(&mut self, configs: Vec<IndicatorConfig>) -> Result<(), ControllerError> {
        validate_configs(&configs)?;
        self.indicators = configs;
        self.main.apply_indicators(&self.indicators)?;
        self.oscillator.apply_indicators(&self.indicators)?;
        Ok(())
    }

    /// Apply RSI panel settings: the RSI period and the guide levels.
    pub fn set_rsi_panel(&mut self, config: RsiPanelConfig) -> Result<(), ControllerError> {
        validate_period(config.period)?;
        for indicator in self
            .indicators
            .iter_mut()
            .filter(|indicator| indicator.kind == IndicatorKind::Rsi)
        {
            indicator.period = config.period;
        }
        self.oscillator.set_guide_levels(config.guide_levels())?;
        self.oscillator.apply_indicators(&self.indicators)?;
        self.rsi_panel = config;
        Ok(())
    }

    /// Show (or, with `None`, clear) analysis levels on the main chart.
    pub fn set_analysis(&mut self, analysis: Option<ChartAnalysis>) -> Result<(), ControllerError> {
        self.analysis = analysis;
        self.main.set_annotations(self.analysis_levels())?;
        Ok(())
    }

    pub fn set_analysis_display(&mut self, display: AnalysisDisplay) -> Result<(), ControllerError> {
        self.analysis_display = display;
        self.main.set_annotations(self.analysis_levels())?;
        Ok(())
    }

    pub fn set_range_markers(&mut self, markers: RangeMarkers) -> Result<(), ControllerError> {
        self.main.set_range_markers(markers.clone())?;
        self.range_markers = markers;
        Ok(())
    }

    fn analysis_levels(&self) -> Vec<PriceLevel> {
        self.analysis
            .as_ref()
            .map(|analysis| analysis.price_levels(&self.analysis_display))
            .unwrap_or_default()
    }

    pub fn latest_quote(&self) -> Option<Quote> {
        let candles = self.candles.as_ref()?;
        let last = candles.last()?;
        let change_percent = candles
            .len()
            .checked_sub(2)
            .map(|idx| candles[idx].close)
            .filter(|previous| *previous != 0.0)
            .map(|previous| (last.close - previous) / previous * 100.0);
        Some(Quote {
            time: last.time,
            price: last.close,
            volume: last.volume,
            change_percent,
        })
    }

    /// Stop synchronizing, then release both surfaces.
    pub fn unmount(&mut self) {
        self.synchronizer.teardown();
        self.main.dispose();
        self.oscillator.dispose();
        self.mount = None;
        info!(selection = %self.selection, "dashboard unmounted");
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        self.synchronizer.teardown();
    }
}
