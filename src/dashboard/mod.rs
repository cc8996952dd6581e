//! Dashboard orchestration: selection, loading, and the main/RSI chart pair.

pub mod controller;
pub mod selection;

pub use controller::{ControllerError, DashboardController};
pub use selection::{LoadOutcome, LoadStatus, Quote, Selection};
