// ⏰ Time helpers - one storage format, one place that parses it
//
// Every timestamp column is TEXT formatted `YYYY-MM-DD HH:MM:SS` in local
// time. All arithmetic happens on `NaiveDateTime`; callers pass `now` in.

use crate::error::{Error, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `Friday, 04/08  4:57 PM`
pub const ACTIVITY_FORMAT: &str = "%A, %m/%d %_I:%M %p";

/// Gregorian month and year lengths, so ages bucket the same way every year
const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_MONTH: i64 = 2_629_746;
const SECONDS_PER_YEAR: i64 = 31_556_952;

/// Current local time, truncated to whole seconds (the storage precision)
pub fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn format_timestamp(time: NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Optional timestamps render as an empty string, like a missing column
pub fn format_optional(time: Option<NaiveDateTime>) -> String {
    time.map(format_timestamp).unwrap_or_default()
}

pub fn format_activity_time(time: NaiveDateTime) -> String {
    time.format(ACTIVITY_FORMAT).to_string()
}

/// Parse a stored `YYYY-MM-DD HH:MM:SS` timestamp
pub fn parse_timestamp(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| Error::parse("timestamp", input, e))
}

/// Parse user input that is either a date (`2020-08-31`) or a full timestamp
pub fn parse_date_input(input: &str) -> Result<NaiveDateTime> {
    let trimmed = input.trim();

    if let Ok(time) = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT) {
        return Ok(time);
    }

    let date = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|e| Error::parse("date", input, e))?;

    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::parse("date", input, "midnight does not exist"))
}

// ============================================================================
// AGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Age {
    Weeks(i64),
    Months(i64),
    Years(i64),
}

impl Age {
    /// Bucket the elapsed time since `birthdate` into weeks, months or years
    ///
    /// Under 30 days counts weeks, under 365 days counts months, anything
    /// older counts years. Each count is floored. A birthdate in the future
    /// counts as zero days old.
    pub fn between(birthdate: NaiveDateTime, now: NaiveDateTime) -> Age {
        let days = (now - birthdate).num_days().max(0);
        let seconds = days * SECONDS_PER_DAY;

        if days < 30 {
            Age::Weeks(days / 7)
        } else if days < 365 {
            Age::Months(seconds / SECONDS_PER_MONTH)
        } else {
            Age::Years(seconds / SECONDS_PER_YEAR)
        }
    }

    pub fn count(&self) -> i64 {
        match self {
            Age::Weeks(n) | Age::Months(n) | Age::Years(n) => *n,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Age::Weeks(_) => "week",
            Age::Months(_) => "month",
            Age::Years(_) => "year",
        }
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.count();
        let suffix = if count == 1 { "" } else { "s" };
        write!(f, "{} {}{}", count, self.unit(), suffix)
    }
}
