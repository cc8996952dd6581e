//! Small numeric helpers used by the indicator functions.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// EMA smoothing constant `2 / (period + 1)`.
pub fn smoothing_factor(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

pub fn ema_step(previous: f64, value: f64, k: f64) -> f64 {
    value * k + previous * (1.0 - k)
}

/// Wilder's running average: `(prev * (n - 1) + value) / n`.
pub fn wilder_step(previous: f64, value: f64, period: usize) -> f64 {
    let n = period as f64;
    (previous * (n - 1.0) + value) / n
}
