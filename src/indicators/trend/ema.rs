//! EMA (Exponential Moving Average) indicator

use crate::common::math;
use crate::models::{Candle, IndicatorPoint, IndicatorSeries};

/// EMA over closes with `k = 2 / (period + 1)`, seeded by the SMA of the
/// first `period` closes at `candles[period - 1]`. Output length is
/// `candles.len() - period + 1`.
pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || candles.len() < period {
        return IndicatorSeries::empty();
    }

    let seed_closes: Vec<f64> = candles[..period].iter().map(|c| c.close).collect();
    let Some(mut ema) = math::mean(&seed_closes) else {
        return IndicatorSeries::empty();
    };
    let k = math::smoothing_factor(period);

    let mut points = Vec::with_capacity(candles.len() - period + 1);
    points.push(IndicatorPoint::new(candles[period - 1].time, ema));
    for candle in &candles[period..] {
        ema = math::ema_step(ema, candle.close, k);
        points.push(IndicatorPoint::new(candle.time, ema));
    }

    IndicatorSeries::from(points)
}

/// Calculate multiple EMAs at once
pub fn calculate_emas(candles: &[Candle], periods: &[usize]) -> Vec<IndicatorSeries> {
    periods
        .iter()
        .map(|&period| calculate_ema(candles, period))
        .collect()
}
