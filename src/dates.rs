//! Date normalization for article previews.
//!
//! The archive listing renders publication dates for humans: full dates for
//! older posts (`"March 5, 2024"`, `"Mar 5, 2024"`), yearless dates for the
//! current year (`"Mar 5"`) and relative phrases for the last day or so
//! (`"5 hr ago"`, `"Yesterday"`). [`DateNormalizer`] turns each of these into a
//! [`DateKey`] whose integer order matches chronological order.

use crate::error::{ArchiveError, Result};
use chrono::{Datelike, Duration, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Formats carrying an explicit year, tried in order.
const DATED_FORMATS: [&str; 3] = ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d"];

static RELATIVE_AGO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(m|mins?|minutes?|h|hrs?|hours?|d|days?)\s+ago$")
        .expect("relative date pattern is valid")
});

/// A publication date encoded as `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(u32);

impl DateKey {
    /// Build a key from a `YYYYMMDD` integer, rejecting impossible dates.
    pub fn from_ymd_int(value: u32) -> Result<Self> {
        let (y, m, d) = (value / 10_000, (value / 100) % 100, value % 100);
        NaiveDate::from_ymd_opt(y as i32, m, d)
            .map(Self::from)
            .ok_or_else(|| ArchiveError::ParseError(value.to_string()))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn to_naive_date(self) -> NaiveDate {
        let (y, m, d) = (self.0 / 10_000, (self.0 / 100) % 100, self.0 % 100);
        // Every DateKey is constructed from a valid NaiveDate.
        NaiveDate::from_ymd_opt(y as i32, m, d).unwrap_or_default()
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date.year() as u32 * 10_000 + date.month() * 100 + date.day())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts `YYYYMMDD` or `YYYY-MM-DD`.
impl FromStr for DateKey {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
            let value = s
                .parse::<u32>()
                .map_err(|_| ArchiveError::ParseError(s.to_string()))?;
            return Self::from_ymd_int(value);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self::from)
            .map_err(|_| ArchiveError::ParseError(s.to_string()))
    }
}

/// Converts rendered preview dates into [`DateKey`]s relative to a fixed "today".
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    today: NaiveDate,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

impl DateNormalizer {
    /// `today` anchors yearless and relative dates.
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Normalize one rendered date string.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::ParseError`] carrying the raw input when no known
    /// format matches.
    pub fn normalize(&self, raw: &str) -> Result<DateKey> {
        let cleaned = clean(raw);
        let lower = cleaned.to_lowercase();

        match lower.as_str() {
            "today" | "just now" => return Ok(self.today.into()),
            "yesterday" => return Ok((self.today - Duration::days(1)).into()),
            _ => {}
        }

        if let Some(caps) = RELATIVE_AGO.captures(&cleaned) {
            let amount: i64 = caps[1]
                .parse()
                .map_err(|_| ArchiveError::ParseError(raw.to_string()))?;
            let unit = caps[2].to_lowercase();
            let ago = if unit.starts_with('d') {
                Duration::days(amount)
            } else if unit.starts_with('h') {
                Duration::hours(amount)
            } else {
                Duration::minutes(amount)
            };
            // Offsets are measured back from the end of today.
            let date = (self.today.and_hms_opt(23, 59, 59).unwrap_or_default() - ago).date();
            return Ok(date.min(self.today).into());
        }

        let cleaned = fix_month_abbreviation(&cleaned);
        if let Some(date) = parse_dated(&cleaned) {
            return Ok(date.into());
        }

        // Current-year previews omit the year.
        let with_year = format!("{}, {}", cleaned, self.today.year());
        if let Some(date) = parse_dated(&with_year) {
            if date <= self.today {
                return Ok(date.into());
            }
            let previous = format!("{}, {}", cleaned, self.today.year() - 1);
            if let Some(date) = parse_dated(&previous) {
                return Ok(date.into());
            }
        }

        Err(ArchiveError::ParseError(raw.to_string()))
    }
}

fn clean(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Substack abbreviates September as "Sept", which chrono's `%b` rejects.
fn fix_month_abbreviation(s: &str) -> String {
    match s.split_once(' ') {
        Some((month, rest)) if month.eq_ignore_ascii_case("sept") => format!("Sep {rest}"),
        _ => s.to_string(),
    }
}

fn parse_dated(s: &str) -> Option<NaiveDate> {
    DATED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}
