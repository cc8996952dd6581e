//! Market data services.

pub mod binance;
pub mod bingx;
pub mod http;
pub mod market_data;

pub use binance::BinanceFuturesGateway;
pub use bingx::BingxGateway;
pub use http::HttpFetcher;
pub use market_data::{DataSource, DataUnavailableError, MarketDataGateway, SelectionParseError, Timeframe};

use crate::config::DashboardConfig;
use std::collections::HashMap;
use std::sync::Arc;

pub type GatewayMap = HashMap<DataSource, Arc<dyn MarketDataGateway>>;

/// One gateway per supported provider, sharing a single HTTP client.
pub fn build_gateways(config: &DashboardConfig) -> Result<GatewayMap, DataUnavailableError> {
    let http = HttpFetcher::new(config.http.timeout, config.http.retry_policy())?;

    let mut gateways: GatewayMap = HashMap::new();
    for source in DataSource::all() {
        let gateway: Arc<dyn MarketDataGateway> = match source {
            DataSource::Binance => Arc::new(BinanceFuturesGateway::new(&config.binance_url, http.clone())?),
            DataSource::Bingx => Arc::new(BingxGateway::new(&config.bingx_url, http.clone())?),
        };
        gateways.insert(source, gateway);
    }
    Ok(gateways)
}
