//! Preferred-time extraction from free-form lead messages.
//!
//! An ordered pattern table is tried against the lowercased input; the
//! first pattern that resolves to a future instant wins. Patterns run from
//! most specific to least specific so a bare "3pm" never shadows
//! "3pm tomorrow". A 12-hour clock with an explicit meridiem is required;
//! meridiem-less input is not accepted.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";

static DAY_THEN_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(today|tomorrow)\b(?:\s+at)?\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b")
        .expect("day-then-time pattern compiles")
});

static TIME_THEN_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s+(?:on\s+)?(today|tomorrow)\b")
        .expect("time-then-day pattern compiles")
});

static WEEKDAY_THEN_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b({WEEKDAYS})\b(?:\s+at)?\s+(\d{{1,2}})(?::(\d{{2}}))?\s*(am|pm)\b"
    ))
    .expect("weekday-then-time pattern compiles")
});

static TIME_THEN_WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})(?::(\d{{2}}))?\s*(am|pm)\s+(?:on\s+|next\s+)?({WEEKDAYS})\b"
    ))
    .expect("time-then-weekday pattern compiles")
});

static CONTEXT_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:at|around|about)\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b")
        .expect("context-time pattern compiles")
});

/// Extract a candidate future instant from free-form text, relative to
/// `now` in business time. Malformed input yields `None`, never an error.
pub fn parse_preferred_time(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let text = text.to_lowercase();

    // Explicit past references can only resolve behind `now`.
    if text.contains("yesterday") || text.contains("last week") {
        return None;
    }

    let resolvers: &[fn(&str, DateTime<Tz>) -> Option<DateTime<Tz>>] = &[
        resolve_day_then_time,
        resolve_time_then_day,
        resolve_weekday_then_time,
        resolve_time_then_weekday,
        resolve_context_time,
    ];

    for resolve in resolvers {
        if let Some(instant) = resolve(&text, now) {
            // A resolved instant at or before now is discarded and the
            // remaining patterns still get a chance.
            if instant > now {
                return Some(instant);
            }
        }
    }

    None
}

fn resolve_day_then_time(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let caps = DAY_THEN_TIME.captures(text)?;
    let date = relative_date(caps.get(1)?.as_str(), now)?;
    let (hour, minute) = clock_components(&caps, 2, 3, 4)?;
    local_instant(now.timezone(), date, hour, minute)
}

fn resolve_time_then_day(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let caps = TIME_THEN_DAY.captures(text)?;
    let date = relative_date(caps.get(4)?.as_str(), now)?;
    let (hour, minute) = clock_components(&caps, 1, 2, 3)?;
    local_instant(now.timezone(), date, hour, minute)
}

fn resolve_weekday_then_time(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let caps = WEEKDAY_THEN_TIME.captures(text)?;
    let weekday = weekday_from_name(caps.get(1)?.as_str())?;
    let (hour, minute) = clock_components(&caps, 2, 3, 4)?;
    local_instant(now.timezone(), next_weekday_date(now.date_naive(), weekday), hour, minute)
}

fn resolve_time_then_weekday(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let caps = TIME_THEN_WEEKDAY.captures(text)?;
    let weekday = weekday_from_name(caps.get(4)?.as_str())?;
    let (hour, minute) = clock_components(&caps, 1, 2, 3)?;
    local_instant(now.timezone(), next_weekday_date(now.date_naive(), weekday), hour, minute)
}

fn resolve_context_time(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let caps = CONTEXT_TIME.captures(text)?;
    let (hour, minute) = clock_components(&caps, 1, 2, 3)?;
    local_instant(now.timezone(), now.date_naive(), hour, minute)
}

fn clock_components(
    caps: &regex::Captures<'_>,
    hour_idx: usize,
    minute_idx: usize,
    meridiem_idx: usize,
) -> Option<(u32, u32)> {
    let hour12: u32 = caps.get(hour_idx)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(minute_idx) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if minute > 59 {
        return None;
    }
    let hour = to_24_hour(hour12, caps.get(meridiem_idx)?.as_str())?;
    Some((hour, minute))
}

fn to_24_hour(hour12: u32, meridiem: &str) -> Option<u32> {
    if !(1..=12).contains(&hour12) {
        return None;
    }
    match (meridiem, hour12) {
        ("am", 12) => Some(0),
        ("am", h) => Some(h),
        ("pm", 12) => Some(12),
        ("pm", h) => Some(h + 12),
        _ => None,
    }
}

fn relative_date(word: &str, now: DateTime<Tz>) -> Option<NaiveDate> {
    match word {
        "today" => Some(now.date_naive()),
        "tomorrow" => Some(now.date_naive() + Duration::days(1)),
        _ => None,
    }
}

/// A named weekday resolves to its NEXT occurrence strictly after today;
/// if today is that weekday, resolution advances a full week. This avoids
/// the "this Tuesday" vs "next Tuesday" ambiguity.
fn next_weekday_date(today: NaiveDate, target: Weekday) -> NaiveDate {
    let current = today.weekday().num_days_from_monday();
    let wanted = target.num_days_from_monday();
    let mut ahead = (7 + wanted - current) % 7;
    if ahead == 0 {
        ahead = 7;
    }
    today + Duration::days(i64::from(ahead))
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn local_instant(zone: Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&date.and_hms_opt(hour, minute, 0)?).single()
}
