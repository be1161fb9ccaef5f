//! Projection of instants into the fixed target zone, and quarter math.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;

/// An instant seen through the target zone's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarMoment {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub date_key: String,
}

impl CalendarMoment {
    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn quarter(&self) -> QuarterId {
        QuarterId::new(self.year, quarter_of_month(self.month))
    }

    /// `YYYY-MM-DDTHH:MM` in the target zone, used as the log stamp.
    pub fn stamp(&self) -> String {
        format!("{}T{:02}:{:02}", self.date_key, self.hour, self.minute)
    }
}

pub fn quarter_of_month(month: u32) -> u8 {
    match month {
        0..=3 => 1,
        4..=6 => 2,
        7..=9 => 3,
        _ => 4,
    }
}

/// A calendar quarter. Ordered by `(year, quarter)`, which is also the
/// order of [`QuarterId::ordinal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct QuarterId {
    pub year: i32,
    pub quarter: u8,
}

impl QuarterId {
    pub fn new(year: i32, quarter: u8) -> Self {
        Self { year, quarter }
    }

    pub fn ordinal(self) -> i64 {
        i64::from(self.year) * 4 + i64::from(self.quarter) - 1
    }

    /// `2026-q1`; used both as the remote history segment and the file stem.
    pub fn key(self) -> String {
        format!("{}-q{}", self.year, self.quarter)
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.key())
    }

    /// Inverse of [`QuarterId::file_name`]. Anything else is `None`.
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        let (year, quarter) = stem.split_once("-q")?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if quarter.len() != 1 {
            return None;
        }
        let quarter = quarter.parse::<u8>().ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        Some(Self::new(year.parse().ok()?, quarter))
    }
}

impl fmt::Display for QuarterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClockContext {
    zone: Tz,
}

impl ClockContext {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let zone = name
            .trim()
            .parse::<Tz>()
            .map_err(|err| anyhow!("unknown time zone `{name}`: {err}"))?;
        Ok(Self::new(zone))
    }

    pub fn zone_name(&self) -> &'static str {
        self.zone.name()
    }

    pub fn moment(&self, instant: DateTime<Utc>) -> CalendarMoment {
        let local = self.zone.from_utc_datetime(&instant.naive_utc());
        CalendarMoment {
            year: local.year(),
            month: local.month(),
            day: local.day(),
            hour: local.hour(),
            minute: local.minute(),
            second: local.second(),
            date_key: local.format("%Y-%m-%d").to_string(),
        }
    }

    /// The calendar day a rollover at `instant` archives: exactly 24 hours
    /// earlier, projected through the zone.
    pub fn previous_day(&self, instant: DateTime<Utc>) -> CalendarMoment {
        self.moment(instant - Duration::hours(24))
    }
}
