use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Wall-clock fields of `instant` as seen at `offset_hours` from UTC, or
/// in local time when no offset is given.
pub fn wall_clock(instant: DateTime<Utc>, offset_hours: Option<i32>) -> NaiveDateTime {
    match offset_hours {
        Some(hours) => instant
            .naive_utc()
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .unwrap_or_else(|| instant.naive_utc()),
        None => instant.with_timezone(&Local).naive_local(),
    }
}

/// `YYYY-MM-DDTHH:mm:ss`, no fractional seconds or zone suffix.
pub fn format_timestamp(instant: DateTime<Utc>, offset_hours: Option<i32>) -> String {
    wall_clock(instant, offset_hours)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Calendar date used to partition log files.
pub fn local_date(instant: DateTime<Utc>, offset_hours: Option<i32>) -> NaiveDate {
    wall_clock(instant, offset_hours).date()
}
