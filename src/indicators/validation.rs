//! Boundary checks for indicator inputs.

use super::IndicatorError;
use crate::models::{Candle, IndicatorConfig};

pub fn validate_period(period: usize) -> Result<usize, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod(period));
    }
    Ok(period)
}

/// Candles must be strictly ascending by time. Gaps are fine.
pub fn validate_candles(candles: &[Candle]) -> Result<(), IndicatorError> {
    for (index, pair) in candles.windows(2).enumerate() {
        if pair[1].time <= pair[0].time {
            return Err(IndicatorError::UnorderedCandles {
                index: index + 1,
                time: pair[1].time,
                previous: pair[0].time,
            });
        }
    }
    Ok(())
}

pub fn validate_configs(configs: &[IndicatorConfig]) -> Result<(), IndicatorError> {
    for config in configs {
        validate_period(config.period)?;
    }
    Ok(())
}
