use thiserror::Error;

/// Input problems caught at the controller boundary. The math itself never
/// fails on short input; it returns an empty series instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("indicator period must be greater than zero (got {0})")]
    InvalidPeriod(usize),
    #[error("candle at index {index} (time {time}) is not after its predecessor (time {previous})")]
    UnorderedCandles { index: usize, time: i64, previous: i64 },
}
