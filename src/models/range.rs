use serde::{Deserialize, Serialize};
use std::fmt;

/// Time window rendered by one chart surface, in unix seconds (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisibleRange {
    pub from: i64,
    pub to: i64,
}

impl VisibleRange {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    pub fn span(&self) -> i64 {
        self.to - self.from
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }

    pub fn contains(&self, time: i64) -> bool {
        time >= self.from && time <= self.to
    }

    /// Clamp to `bounds`; `None` when the two windows do not overlap.
    pub fn clamp_to(&self, bounds: VisibleRange) -> Option<VisibleRange> {
        let clamped = VisibleRange {
            from: self.from.max(bounds.from),
            to: self.to.min(bounds.to),
        };
        clamped.is_valid().then_some(clamped)
    }

    pub fn shifted(&self, delta: i64) -> VisibleRange {
        VisibleRange {
            from: self.from + delta,
            to: self.to + delta,
        }
    }
}

impl fmt::Display for VisibleRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}
