use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Timelike, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

/// An agent's bookable window: `[start_hour, end_hour)` on each active
/// weekday, interpreted in the business timezone.
///
/// Weekdays are numbered 0 = Monday .. 6 = Sunday.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
    pub weekdays: BTreeSet<u8>,
}

impl WorkingHours {
    pub fn new(
        start_hour: u32,
        end_hour: u32,
        weekdays: impl IntoIterator<Item = u8>,
    ) -> Result<Self, ValidationError> {
        let hours = Self { start_hour, end_hour, weekdays: weekdays.into_iter().collect() };
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(ValidationError::InvalidWorkingHours {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        if let Some(&day) = self.weekdays.iter().find(|&&d| d > 6) {
            return Err(ValidationError::InvalidWeekday(day));
        }
        Ok(())
    }

    pub fn weekday_active(&self, weekday: Weekday) -> bool {
        self.weekdays.contains(&(weekday.num_days_from_monday() as u8))
    }

    /// True when `instant`'s hour falls inside the working window. A slot
    /// starting at `end_hour` is outside, matching the half-open window.
    pub fn hour_in_window(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }

    pub fn covers(&self, instant: &DateTime<Tz>) -> bool {
        self.weekday_active(instant.weekday()) && self.hour_in_window(instant.hour())
    }

    /// The working window on `instant`'s calendar day, or `None` when that
    /// day is not an active weekday (or the local times do not exist, as in
    /// a DST gap).
    pub fn window_for(&self, instant: &DateTime<Tz>) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        use chrono::TimeZone;

        if !self.weekday_active(instant.weekday()) {
            return None;
        }
        let zone = instant.timezone();
        let date = instant.date_naive();
        let start = zone.from_local_datetime(&date.and_hms_opt(self.start_hour, 0, 0)?).single()?;
        let end = if self.end_hour == 24 {
            let next = date + chrono::Duration::days(1);
            zone.from_local_datetime(&next.and_hms_opt(0, 0, 0)?).single()?
        } else {
            zone.from_local_datetime(&date.and_hms_opt(self.end_hour, 0, 0)?).single()?
        };
        Some((start, end))
    }
}

/// A bookable human, owned by the agent directory. Read-only to the
/// scheduling core; the external identity fields address the conferencing
/// host and the calendar this agent's busy time lives on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub display_name: String,
    pub working_hours: WorkingHours,
    pub conferencing_host_id: String,
    pub calendar_id: String,
}

#[cfg(test)]
mod tests {
    use super::WorkingHours;
    use chrono::Weekday;

    #[test]
    fn rejects_start_at_or_after_end() {
        assert!(WorkingHours::new(18, 9, [0, 1]).is_err());
        assert!(WorkingHours::new(9, 9, [0]).is_err());
    }

    #[test]
    fn rejects_weekday_out_of_range() {
        assert!(WorkingHours::new(9, 18, [0, 7]).is_err());
    }

    #[test]
    fn weekday_activity_uses_monday_zero_numbering() {
        let hours = WorkingHours::new(9, 18, [0, 4]).expect("valid hours");
        assert!(hours.weekday_active(Weekday::Mon));
        assert!(hours.weekday_active(Weekday::Fri));
        assert!(!hours.weekday_active(Weekday::Sun));
    }

    #[test]
    fn working_window_is_half_open() {
        let hours = WorkingHours::new(9, 18, [0]).expect("valid hours");
        assert!(hours.hour_in_window(9));
        assert!(hours.hour_in_window(17));
        assert!(!hours.hour_in_window(18));
    }
}
