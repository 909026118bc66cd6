//! Timestamp source for emitted events.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

/// Issues strictly increasing event timestamps.
///
/// Timestamps are truncated to microseconds, the precision the relational
/// store keeps, and bumped by one microsecond whenever the wall clock has
/// not moved past the previous value.
#[derive(Debug, Default)]
pub struct EventClock {
    last: Option<DateTime<Utc>>,
}

impl EventClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next timestamp.
    pub fn next(&mut self) -> DateTime<Utc> {
        self.next_after(Utc::now())
    }

    /// Returns the last issued timestamp, if any.
    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.last
    }

    fn next_after(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(6);
        let next = match self.last {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last = Some(next);
        next
    }
}
