use chrono::{DateTime, Duration};
use chrono_tz::Tz;

/// An externally reported commitment, half-open: `[start, end)`.
///
/// Produced only by the availability source; the core compares these but
/// never stores them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl BusyInterval {
    /// Half-open overlap test. Strict inequalities on both sides so that a
    /// slot ending exactly where a commitment starts (or starting exactly
    /// where one ends) does not conflict.
    pub fn overlaps(&self, start: DateTime<Tz>, end: DateTime<Tz>) -> bool {
        start < self.end && end > self.start
    }
}

/// A proposed bookable slot. Ephemeral: created and discarded within a
/// single slot-finding call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateSlot {
    pub start: DateTime<Tz>,
    pub duration_minutes: i64,
    /// Absolute distance to the caller's preferred instant, used only for
    /// ranking. `None` when no preference was given.
    pub distance_from_preference: Option<Duration>,
}

impl CandidateSlot {
    pub fn end(&self) -> DateTime<Tz> {
        self.start + Duration::minutes(self.duration_minutes)
    }

    pub fn conflicts_with(&self, busy: &BusyInterval) -> bool {
        busy.overlaps(self.start, self.end())
    }
}
