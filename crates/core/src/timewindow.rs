//! Timezone-safe construction, comparison, and formatting of instants in
//! the business's single operating timezone.
//!
//! Every working-hours and display calculation happens in this one zone;
//! UTC appears only at the persistence and wire boundaries.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::ValidationError;

pub const DEFAULT_BUSINESS_TIMEZONE: &str = "Asia/Singapore";

/// Resolve and validate the configured zone name once at startup.
pub fn ensure_business_zone(name: &str) -> Result<Tz, ValidationError> {
    name.parse::<Tz>().map_err(|_| ValidationError::UnknownTimezone(name.to_string()))
}

/// Clock pinned to the business timezone. Tests construct one over a fixed
/// zone and pass explicit instants instead of calling `now`.
#[derive(Clone, Copy, Debug)]
pub struct BusinessClock {
    zone: Tz,
}

impl BusinessClock {
    pub fn new(zone_name: &str) -> Result<Self, ValidationError> {
        Ok(Self { zone: ensure_business_zone(zone_name)? })
    }

    pub fn with_zone(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.zone)
    }

    /// Canonical in-memory form: any UTC instant normalized into the
    /// business zone.
    pub fn to_business_time(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.zone)
    }

    /// Build a business-zone instant from wall-clock components, rejecting
    /// nonexistent or ambiguous local times (DST gaps).
    pub fn at(
        &self,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Option<DateTime<Tz>> {
        self.zone.with_ymd_and_hms(year, month, day, hour, minute, 0).single()
    }
}

/// Human-readable localized rendering, e.g. `Saturday, June 15 at 3:00 PM`.
pub fn format_display(instant: &DateTime<Tz>) -> String {
    instant.format("%A, %B %-d at %-I:%M %p").to_string()
}

/// Offset-qualified rendering (`YYYY-MM-DDTHH:mm:ss+08:00`) for calendar
/// APIs that require an explicit UTC offset rather than a zone name.
pub fn format_offset(instant: &DateTime<Tz>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
