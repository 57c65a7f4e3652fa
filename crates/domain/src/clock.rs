use std::sync::Mutex;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Process-wide monotonic timestamp source for mutation events.
///
/// Audit entry names embed the event timestamp at millisecond
/// resolution as their ordering and uniqueness key, so two events must
/// never observe the same millisecond. Readings are whole milliseconds:
/// `now` returns the wall clock truncated to the millisecond when it
/// has advanced past the previous reading, and the previous reading
/// plus one millisecond when it has not.
#[derive(Debug, Default)]
pub struct LogicalClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl LogicalClock {
    /// Creates a clock with no prior reading.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next strictly increasing timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let wall = Utc::now();
        let wall = wall
            .duration_trunc(TimeDelta::milliseconds(1))
            .unwrap_or(wall);
        let next = match *last {
            Some(previous) if wall <= previous => previous + TimeDelta::milliseconds(1),
            _ => wall,
        };

        *last = Some(next);
        next
    }
}
