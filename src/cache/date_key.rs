//! Calendar date keys in a single reference timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::metrics::types::TimeWindow;

/// Wire and key format for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default reference offset (UTC+09:00).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

/// Reference timezone used to turn instants into cache keys.
///
/// The same instant maps to the same calendar day for every client,
/// whatever the client's local timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone {
    offset: FixedOffset,
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self::from_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES)
    }
}

impl ReferenceZone {
    /// Zone at a fixed offset east of UTC. Out-of-range offsets fall back to UTC.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| {
            tracing::warn!("Invalid UTC offset {} minutes, using UTC", minutes);
            Utc.fix()
        });
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar day of an instant in this zone.
    pub fn date_of<Tz: chrono::TimeZone>(&self, instant: &DateTime<Tz>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Current calendar day in this zone.
    pub fn today(&self) -> NaiveDate {
        self.date_of(&Utc::now())
    }

    /// The full day `date` as a UTC window.
    pub fn day_window(&self, date: NaiveDate) -> TimeWindow {
        TimeWindow::for_day(date, &self.offset)
    }

    /// Format a date as `yyyy-MM-dd`.
    pub fn format(date: NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    /// Parse a `yyyy-MM-dd` date.
    pub fn parse(s: &str) -> Result<NaiveDate, chrono::ParseError> {
        NaiveDate::parse_from_str(s, DATE_FORMAT)
    }
}
