//! Calendar-day normalization in the target timezone.
//!
//! Every date the engine stores is anchored at a fixed local hour (noon by
//! default) in the target timezone, so rendering it back to a calendar day
//! never shifts by a day regardless of where the process runs. All window
//! comparisons go through calendar days, never raw instant arithmetic.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use crate::clock::Clock;
use crate::Time;

/// Errors raised while normalizing dates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// The input is not a `YYYY-MM-DD` date (optionally followed by a time).
    #[error("malformed date '{0}', expected YYYY-MM-DD")]
    Malformed(String),

    /// UTC offset outside the range real timezones use.
    #[error("invalid UTC offset: {0} hours")]
    InvalidOffset(i32),

    /// Anchor hour outside 0..=23.
    #[error("invalid anchor hour: {0}")]
    InvalidAnchorHour(u32),
}

/// Default target timezone offset (UTC-3).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

/// Default local hour dates are anchored at.
pub const DEFAULT_ANCHOR_HOUR: u32 = 12;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:[T ].*)?$").expect("date pattern is valid")
    })
}

/// The target timezone, as a fixed offset plus the anchor hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
    anchor: NaiveTime,
}

impl Calendar {
    /// Build a calendar for the given UTC offset and anchor hour.
    pub fn new(utc_offset_hours: i32, anchor_hour: u32) -> Result<Self, TimeError> {
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(TimeError::InvalidOffset(utc_offset_hours));
        }
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or(TimeError::InvalidOffset(utc_offset_hours))?;
        let anchor = NaiveTime::from_hms_opt(anchor_hour, 0, 0)
            .ok_or(TimeError::InvalidAnchorHour(anchor_hour))?;
        Ok(Self { offset, anchor })
    }

    /// The fixed offset of the target timezone.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse a `YYYY-MM-DD` string into its anchored instant.
    ///
    /// A trailing time component (after `T` or a space) is discarded.
    pub fn parse_local_date(&self, input: &str) -> Result<Time, TimeError> {
        let malformed = || TimeError::Malformed(input.to_string());
        let caps = date_pattern().captures(input.trim()).ok_or_else(malformed)?;

        let year: i32 = caps[1].parse().map_err(|_| malformed())?;
        let month: u32 = caps[2].parse().map_err(|_| malformed())?;
        let day: u32 = caps[3].parse().map_err(|_| malformed())?;
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)?;

        Ok(self.anchor_day(date))
    }

    /// The anchored instant of a calendar day.
    pub fn anchor_day(&self, day: NaiveDate) -> Time {
        let local = day.and_time(self.anchor);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc)
    }

    /// The anchored instant of the calendar day `instant` falls on.
    pub fn anchor(&self, instant: Time) -> Time {
        self.anchor_day(self.local_day(instant))
    }

    /// Calendar day of an instant in the target timezone.
    pub fn local_day(&self, instant: Time) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Today's anchored instant according to `clock`.
    pub fn today(&self, clock: &dyn Clock) -> Time {
        self.anchor(clock.now())
    }

    /// Whether two instants fall on the same calendar day.
    pub fn same_day(&self, a: Time, b: Time) -> bool {
        self.local_day(a) == self.local_day(b)
    }

    /// Whether `a` falls on a strictly earlier calendar day than `b`.
    pub fn is_before(&self, a: Time, b: Time) -> bool {
        self.local_day(a) < self.local_day(b)
    }

    /// Whether `x` falls within `[start, end]`, both days inclusive.
    pub fn in_range(&self, x: Time, start: Time, end: Time) -> bool {
        let day = self.local_day(x);
        self.local_day(start) <= day && day <= self.local_day(end)
    }

    /// Render as `YYYY-MM-DD`.
    pub fn render_local_date(&self, instant: Time) -> String {
        self.local_day(instant).format("%Y-%m-%d").to_string()
    }

    /// Render as `DD/MM/YYYY`, the form shown to students.
    pub fn render_display_date(&self, instant: Time) -> String {
        self.local_day(instant).format("%d/%m/%Y").to_string()
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            offset: FixedOffset::west_opt(3 * 3600).expect("UTC-3 is a valid offset"),
            anchor: NaiveTime::from_hms_opt(DEFAULT_ANCHOR_HOUR, 0, 0)
                .expect("noon is a valid time"),
        }
    }
}
