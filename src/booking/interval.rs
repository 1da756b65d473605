use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open time interval backing every scheduling comparison in the
/// booking module. The end instant is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    start: DateTime<Utc>,
    duration_minutes: u32,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, duration_minutes: u32) -> Result<Self, IntervalError> {
        if duration_minutes == 0 {
            return Err(IntervalError::NonPositiveDuration);
        }
        Ok(Self {
            start,
            duration_minutes,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Half-open intersection test: touching endpoints do not overlap, so a
    /// lesson ending at 10:00 never blocks one starting at 10:00.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Same slot means identical start instant and identical duration, the
    /// only shape under which group lessons share a teacher.
    pub fn same_slot(&self, other: &Interval) -> bool {
        self.start == other.start && self.duration_minutes == other.duration_minutes
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntervalError {
    #[error("duration must be a positive number of minutes")]
    NonPositiveDuration,
}
