// libs/scheduling-cell/src/services/conflict.rs
use chrono::{DateTime, Utc};

/// A half-open interval `[start, end)` on a professional's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Half-open overlap test: touching endpoints do not conflict.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// True when the proposed window collides with any existing occupied window.
pub fn has_conflict(existing: &[TimeWindow], proposed: &TimeWindow) -> bool {
    existing.iter().any(|window| window.overlaps(proposed))
}
