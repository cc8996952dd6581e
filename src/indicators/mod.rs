//! Indicator engine: pure functions deriving overlay series from candles.

pub mod error;
pub mod registry;
pub mod validation;

pub mod momentum;
pub mod trend;
pub mod volume;

pub use error::IndicatorError;
pub use registry::*;
pub use validation::*;
