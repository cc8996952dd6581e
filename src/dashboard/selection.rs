use crate::config::DashboardConfig;
use crate::services::{DataSource, Timeframe};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the dashboard is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub source: DataSource,
}

impl Selection {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, source: DataSource) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            source,
        }
    }
}

impl From<&DashboardConfig> for Selection {
    fn from(config: &DashboardConfig) -> Self {
        Self::new(config.symbol.clone(), config.timeframe, config.provider)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.symbol, self.timeframe, self.source)
    }
}

/// Last trade summary shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub time: i64,
    pub price: f64,
    pub volume: Option<f64>,
    /// Percent change against the previous candle's close.
    pub change_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready { candles: usize },
    NoData,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { candles: usize },
    /// The provider returned nothing; charts keep their previous content.
    NoData,
}
