//! Working-hours-aware candidate slot enumeration.
//!
//! The generator is pure: it works over an already-fetched busy list so the
//! async slot finder can make exactly one batched availability call per
//! search, regardless of how many candidates get enumerated.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::domain::agent::WorkingHours;
use crate::domain::interval::{BusyInterval, CandidateSlot};

#[derive(Clone, Debug)]
pub struct SchedulingConfig {
    pub slot_minutes: i64,
    pub buffer_minutes: i64,
    pub search_days: i64,
    pub max_results: usize,
    pub offer_ttl_hours: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 60,
            buffer_minutes: 30,
            search_days: 14,
            max_results: 10,
            offer_ttl_hours: 24,
        }
    }
}

/// Enumerate bookable candidate slots between the search anchor and
/// `anchor + search_days`, stepping in fixed-duration increments through
/// each active weekday's working window only.
///
/// Rejections: slots starting at or before `now + buffer`, and slots
/// overlapping a busy interval under the half-open test. With a preferred
/// instant the survivors are ranked by absolute distance to it (ties stay
/// chronological); otherwise chronological. Result is capped.
pub fn generate_candidates(
    hours: &WorkingHours,
    busy: &[BusyInterval],
    preferred: Option<DateTime<Tz>>,
    now: DateTime<Tz>,
    config: &SchedulingConfig,
) -> Vec<CandidateSlot> {
    if hours.validate().is_err() || hours.weekdays.is_empty() {
        return Vec::new();
    }

    let zone = now.timezone();
    let Some((search_start, search_end)) = search_window(hours, preferred, now, config) else {
        return Vec::new();
    };

    let slot = Duration::minutes(config.slot_minutes);
    let cutoff = now + Duration::minutes(config.buffer_minutes);
    let mut candidates = Vec::new();

    for offset in 0..=config.search_days {
        let date = search_start.date_naive() + Duration::days(offset);
        if !hours.weekday_active(date.weekday()) {
            continue;
        }
        let Some(mut start) = local_time(zone, date, hours.start_hour, 0) else {
            continue;
        };
        let Some(day_end) = local_time(zone, date, hours.end_hour, 0) else {
            continue;
        };

        while start + slot <= day_end {
            let end = start + slot;
            let in_window = start >= search_start && end <= search_end;
            if in_window && start > cutoff && !busy.iter().any(|b| b.overlaps(start, end)) {
                candidates.push(CandidateSlot {
                    start,
                    duration_minutes: config.slot_minutes,
                    distance_from_preference: preferred.map(|p| (start - p).abs()),
                });
            }
            start = end;
        }
    }

    if preferred.is_some() {
        candidates.sort_by_key(|c| {
            c.distance_from_preference.map(|d| d.num_seconds()).unwrap_or(i64::MAX)
        });
    }
    candidates.truncate(config.max_results);
    candidates
}

/// The `[search_start, search_end]` range a slot search will enumerate,
/// which is also the range the availability source should be asked about
/// in its single batched call. `None` when no active weekday exists within
/// the bound.
pub fn search_window(
    hours: &WorkingHours,
    preferred: Option<DateTime<Tz>>,
    now: DateTime<Tz>,
    config: &SchedulingConfig,
) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let search_start = search_anchor(hours, preferred, now, config)?;
    // The window's final day is clipped to the working-hours end.
    let zone = now.timezone();
    let end_date = (search_start + Duration::days(config.search_days)).date_naive();
    let search_end = local_time(zone, end_date, hours.end_hour, 0)
        .unwrap_or(search_start + Duration::days(config.search_days));
    Some((search_start, search_end))
}

/// Anchor rules: a future preferred instant anchors to its calendar day at
/// the working start; otherwise the next whole hour from now, pulled up to
/// today's window start if too early, or forward to the next active
/// weekday's start if today's window is already over. The forward scan is
/// bounded by `search_days`, never "until a working day is found".
fn search_anchor(
    hours: &WorkingHours,
    preferred: Option<DateTime<Tz>>,
    now: DateTime<Tz>,
    config: &SchedulingConfig,
) -> Option<DateTime<Tz>> {
    let zone = now.timezone();

    if let Some(p) = preferred {
        if p > now {
            return local_time(zone, p.date_naive(), hours.start_hour, 0);
        }
    }

    let next_hour = (now + Duration::hours(1))
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))?;

    if hours.weekday_active(next_hour.weekday()) {
        if hours.hour_in_window(next_hour.hour()) {
            return Some(next_hour);
        }
        if next_hour.hour() < hours.start_hour {
            return local_time(zone, next_hour.date_naive(), hours.start_hour, 0);
        }
    }

    for offset in 1..=config.search_days {
        let date = next_hour.date_naive() + Duration::days(offset);
        if hours.weekday_active(date.weekday()) {
            return local_time(zone, date, hours.start_hour, 0);
        }
    }

    None
}

/// Hour 24 is a valid working-window end and means next-day midnight.
fn local_time(zone: Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    let (date, hour) = if hour == 24 { (date + Duration::days(1), 0) } else { (date, hour) };
    zone.from_local_datetime(&date.and_hms_opt(hour, minute, 0)?).single()
}
