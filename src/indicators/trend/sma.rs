//! SMA (Simple Moving Average) over closes

use crate::common::math;
use crate::models::{Candle, IndicatorPoint, IndicatorSeries};

/// Trailing mean of the `period` closes ending at each candle. The first
/// point lands on `candles[period - 1]`.
pub fn calculate_sma(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || candles.len() < period {
        return IndicatorSeries::empty();
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    closes
        .windows(period)
        .zip(&candles[period - 1..])
        .filter_map(|(window, candle)| {
            math::mean(window).map(|value| IndicatorPoint::new(candle.time, value))
        })
        .collect()
}
