//! RSI (Relative Strength Index) indicator

use crate::common::math;
use crate::models::{Candle, IndicatorPoint, IndicatorSeries};

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Calculate the RSI series with Wilder smoothing.
///
/// RSI = 100 - (100 / (1 + RS)), RS = average gain / average loss.
///
/// The averages are seeded from the first `period` close-to-close deltas and
/// the first point lands on `candles[period]`, so the output holds
/// `candles.len() - period` points. Fewer than `period + 1` candles yields an
/// empty series.
pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || candles.len() < period + 1 {
        return IndicatorSeries::empty();
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let (gain, loss) = split_change(candles[i].close - candles[i - 1].close);
        gains += gain;
        losses += loss;
    }

    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    let mut points = Vec::with_capacity(candles.len() - period);
    points.push(IndicatorPoint::new(candles[period].time, rsi_value(avg_gain, avg_loss)));

    for i in (period + 1)..candles.len() {
        let (gain, loss) = split_change(candles[i].close - candles[i - 1].close);
        avg_gain = math::wilder_step(avg_gain, gain, period);
        avg_loss = math::wilder_step(avg_loss, loss, period);
        points.push(IndicatorPoint::new(candles[i].time, rsi_value(avg_gain, avg_loss)));
    }

    IndicatorSeries::from(points)
}

/// Calculate RSI with default period (14)
pub fn calculate_rsi_default(candles: &[Candle]) -> IndicatorSeries {
    calculate_rsi(candles, DEFAULT_RSI_PERIOD)
}

fn split_change(change: f64) -> (f64, f64) {
    if change > 0.0 {
        (change, 0.0)
    } else {
        (0.0, change.abs())
    }
}

/// Zero average loss means RS is infinite: 100. Zero gain against real
/// losses: 0. Neither case may divide.
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    if avg_gain == 0.0 {
        return 0.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
