//! Daily page titles, target-date resolution and query windows.

use crate::oura::OuraError;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MONTHS: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December",
];

/// ---------------------------------------------------------------------------
/// Daily Page Titles
/// ---------------------------------------------------------------------------

fn ordinal_suffix(day: u32) -> &'static str {
  match (day % 10, day % 100) {
    (_, 11..=13) => "th",
    (1, _) => "st",
    (2, _) => "nd",
    (3, _) => "rd",
    _ => "th",
  }
}

/// Title of the daily page for `date`, e.g. "October 19th, 2026".
pub fn date_to_page_title(date: NaiveDate) -> String {
  let day = date.day();
  format!(
    "{} {}{}, {}",
    MONTHS[date.month0() as usize],
    day,
    ordinal_suffix(day),
    date.year()
  )
}

/// Uid of the daily page for `date` ("MM-DD-YYYY").
pub fn date_to_page_uid(date: NaiveDate) -> String {
  date.format("%m-%d-%Y").to_string()
}

/// Parse a daily page title back into a date. Returns `None` for titles that
/// are not daily pages.
pub fn page_title_to_date(title: &str) -> Option<NaiveDate> {
  let (month_name, rest) = title.trim().split_once(' ')?;
  let (day_part, year_part) = rest.split_once(", ")?;

  let month = MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
  let digits = day_part.trim_end_matches(|c: char| c.is_ascii_alphabetic());
  let day: u32 = digits.parse().ok()?;
  if &day_part[digits.len()..] != ordinal_suffix(day) {
    return None;
  }
  let year: i32 = year_part.trim().parse().ok()?;

  NaiveDate::from_ymd_opt(year, month, day)
}

/// ---------------------------------------------------------------------------
/// Query Window
/// ---------------------------------------------------------------------------

/// Which day is queried relative to the date the trigger resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDay {
  /// The resolved date itself
  #[default]
  Same,
  /// The day before the resolved date
  Previous,
}

impl FromStr for QueryDay {
  type Err = OuraError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "same" | "today" => Ok(QueryDay::Same),
      "previous" | "yesterday" => Ok(QueryDay::Previous),
      other => Err(OuraError::InvalidConfig(format!(
        "OURA_QUERY_DAY must be 'same' or 'previous', got '{}'",
        other
      ))),
    }
  }
}

/// One-day window handed to the fetchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl DateWindow {
  pub fn for_day(resolved: NaiveDate, policy: QueryDay) -> Self {
    let start = match policy {
      QueryDay::Same => resolved,
      QueryDay::Previous => resolved - Duration::days(1),
    };
    Self {
      start,
      end: start + Duration::days(1),
    }
  }

  /// `start` as a `YYYY-MM-DD` query parameter
  pub fn start_param(&self) -> String {
    self.start.format("%Y-%m-%d").to_string()
  }

  pub fn end_param(&self) -> String {
    self.end.format("%Y-%m-%d").to_string()
  }
}

impl fmt::Display for DateWindow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.start_param(), self.end_param())
  }
}

/// Date the trigger acts on: the daily page it lives on, or `today` when the
/// page is not a daily page.
pub fn resolve_target_date(page_title: Option<&str>, today: NaiveDate) -> NaiveDate {
  page_title.and_then(page_title_to_date).unwrap_or(today)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
