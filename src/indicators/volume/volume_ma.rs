//! Volume moving average

use crate::common::math;
use crate::models::{Candle, IndicatorPoint, IndicatorSeries};

/// Trailing mean of volume; candles without a volume count as zero.
pub fn calculate_volume_sma(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || candles.len() < period {
        return IndicatorSeries::empty();
    }

    let volumes: Vec<f64> = candles.iter().map(|c| c.volume.unwrap_or(0.0)).collect();
    volumes
        .windows(period)
        .zip(&candles[period - 1..])
        .filter_map(|(window, candle)| {
            math::mean(window).map(|value| IndicatorPoint::new(candle.time, value))
        })
        .collect()
}
