//! `YYYY-MM` parsing and display labels.
//!
//! Malformed input never produces garbage: `MonthYear::from_str` returns a
//! `DateError`, and the display helpers fall back to an empty string.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Label used in place of the end date of a current position.
pub const PRESENT: &str = "Present";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("expected YYYY-MM, got '{0}'")]
    Malformed(String),
    #[error("month {0} is outside 1-12")]
    MonthOutOfRange(u8),
}

/// A validated `YYYY-MM` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthYear {
    pub year: u16,
    /// 1-based.
    pub month: u8,
}

impl FromStr for MonthYear {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DateError::Malformed(s.to_string());

        let (year, month) = s.split_once('-').ok_or_else(malformed)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(malformed());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let year: u16 = year.parse().map_err(|_| malformed())?;
        let month: u8 = month.parse().map_err(|_| malformed())?;
        if !(1..=12).contains(&month) {
            return Err(DateError::MonthOutOfRange(month));
        }
        Ok(MonthYear { year, month })
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abbreviation = MONTH_ABBREVIATIONS[usize::from(self.month - 1)];
        write!(f, "{abbreviation} {}", self.year)
    }
}

/// True when `date` is strictly `YYYY-MM` with a month in 1–12.
pub fn is_valid_month_year(date: &str) -> bool {
    date.parse::<MonthYear>().is_ok()
}

/// `"2020-01"` → `"Jan 2020"`. Empty or malformed input renders as `""`.
pub fn format_month_year(date: &str) -> String {
    if date.is_empty() {
        return String::new();
    }
    date.parse::<MonthYear>()
        .map(|my| my.to_string())
        .unwrap_or_default()
}

/// `"{start} - {end}"`, with `end` replaced by `Present` when `current` is set,
/// whatever value `end` holds.
pub fn format_date_range(start: &str, end: &str, current: bool) -> String {
    let end_label = if current {
        PRESENT.to_string()
    } else {
        format_month_year(end)
    };
    format!("{} - {}", format_month_year(start), end_label)
}
