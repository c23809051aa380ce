use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Current date in the professor's local timezone, falling back to UTC when
/// the local offset cannot be determined.
pub(crate) fn today() -> Date {
    let now = OffsetDateTime::now_utc();
    match UtcOffset::current_local_offset() {
        Ok(offset) => now.to_offset(offset).date(),
        Err(_) => now.date(),
    }
}

pub(crate) fn today_string() -> String {
    format_date(today())
}

pub(crate) fn format_date(value: Date) -> String {
    value.format(&DATE_FORMAT).unwrap_or_else(|_| value.to_string())
}
