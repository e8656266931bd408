// src/time_bin.rs

//! Calendar bucketing of commit timestamps.
//!
//! Every consumer that puts events on a time axis goes through these
//! functions so the same timestamp always lands in the same bucket. All
//! buckets are computed in UTC; weeks start on Monday and quarters on
//! Jan/Apr/Jul/Oct 1.

use crate::error::{Result, StrataError};
use crate::model::Timestamp;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

fn to_datetime(timestamp: Timestamp) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0).ok_or_else(|| StrataError::invalid_timestamp(timestamp))
}

/// True when `timestamp` maps onto a representable calendar date.
pub fn is_valid(timestamp: Timestamp) -> bool {
    to_datetime(timestamp).is_ok()
}

fn midnight(date: NaiveDate) -> Result<Timestamp> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| StrataError::invalid_timestamp(date))
}

fn first_day_of_bin(date: NaiveDate, granularity: Granularity) -> Option<NaiveDate> {
    match granularity {
        Granularity::Day => Some(date),
        Granularity::Week => date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday()))),
        Granularity::Month => date.with_day(1),
        Granularity::Quarter => NaiveDate::from_ymd_opt(date.year(), (date.month0() / 3) * 3 + 1, 1),
        Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    }
}

/// Returns the start of the bin containing `timestamp`.
pub fn bin_start(timestamp: Timestamp, granularity: Granularity) -> Result<Timestamp> {
    let date = to_datetime(timestamp)?.date_naive();
    let first = first_day_of_bin(date, granularity).ok_or_else(|| StrataError::invalid_timestamp(timestamp))?;
    midnight(first)
}

/// Start of the bin following the one that starts at `bin_start`.
fn next_bin(bin_start: Timestamp, granularity: Granularity) -> Result<Timestamp> {
    let date = to_datetime(bin_start)?.date_naive();
    let next = match granularity {
        Granularity::Day => date.checked_add_days(Days::new(1)),
        Granularity::Week => date.checked_add_days(Days::new(7)),
        Granularity::Month => date.checked_add_months(Months::new(1)),
        Granularity::Quarter => date.checked_add_months(Months::new(3)),
        Granularity::Year => date.checked_add_months(Months::new(12)),
    };
    midnight(next.ok_or_else(|| StrataError::invalid_timestamp(bin_start))?)
}

/// Human readable label for a bin, e.g. "Jan 15", "Jan 2024" or "Q1 2024".
pub fn label(bin_start: Timestamp, granularity: Granularity) -> Result<String> {
    let dt = to_datetime(bin_start)?;
    Ok(match granularity {
        Granularity::Day | Granularity::Week => dt.format("%b %-d").to_string(),
        Granularity::Month => dt.format("%b %Y").to_string(),
        Granularity::Quarter => format!("Q{} {}", dt.month0() / 3 + 1, dt.year()),
        Granularity::Year => dt.year().to_string(),
    })
}

/// Every bin start between `start` and `end` inclusive, ascending and
/// without gaps. `start == end` yields one bin; `start > end` yields none.
pub fn enumerate_bins(start: Timestamp, end: Timestamp, granularity: Granularity) -> Result<Vec<Timestamp>> {
    if start > end {
        return Ok(Vec::new());
    }
    // Validate `end` up front so the loop below cannot run past the calendar.
    to_datetime(end)?;

    let mut bins = Vec::new();
    let mut current = bin_start(start, granularity)?;
    while current <= end {
        bins.push(current);
        current = next_bin(current, granularity)?;
    }
    Ok(bins)
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(value: &str) -> Result<Timestamp> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| StrataError::invalid_timestamp(value))?;
    midnight(date)
}
