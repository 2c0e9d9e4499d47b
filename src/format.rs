//! Turns fetched records into the text lines written under the trigger.

use crate::oura::{
  DailyActivityData, DailyReadinessData, DailySleepData, OuraError, SectionRecords, SleepData,
  VendorActivity, VendorReadiness, VendorSleep,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt::Display;

/// Rendered in place of a field the API left out of an otherwise present record
pub const MISSING_VALUE: &str = "N/A";

const CLOCK_FORMAT: &str = "%I:%M:%S %p";

/// `HH:MM:SS`, each component zero-padded. Hours are not wrapped at 24.
pub fn seconds_to_time_string(s: u64) -> String {
  format!("{:02}:{:02}:{:02}", s / 3600, (s / 60) % 60, s % 60)
}

/// Render an API timestamp as a 12-hour clock string in the timestamp's own
/// offset. Plain dates render as midnight.
pub fn clock_time(timestamp: &str) -> Result<String, OuraError> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
    return Ok(dt.format(CLOCK_FORMAT).to_string());
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
    return Ok(dt.format(CLOCK_FORMAT).to_string());
  }
  if let Ok(date) = NaiveDate::parse_from_str(timestamp, "%Y-%m-%d") {
    if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
      return Ok(midnight.format(CLOCK_FORMAT).to_string());
    }
  }
  Err(OuraError::Parse(format!("invalid timestamp '{}'", timestamp)))
}

/// Label/value markup. Attribute mode (`Label:: value`) is the default; the
/// "use plain text" setting switches to `Label: value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletStyle {
  plain_text: bool,
}

impl BulletStyle {
  pub fn new(use_attributes: bool) -> Self {
    Self {
      plain_text: use_attributes,
    }
  }

  pub fn separator(&self) -> &'static str {
    if self.plain_text {
      ":"
    } else {
      "::"
    }
  }

  pub fn bullet(&self, label: &str, value: impl Display) -> String {
    format!("{}{} {}", label, self.separator(), value)
  }
}

fn value<T: Display>(v: Option<T>) -> String {
  v.map_or_else(|| MISSING_VALUE.to_string(), |v| v.to_string())
}

fn duration(seconds: Option<u64>) -> String {
  seconds.map_or_else(|| MISSING_VALUE.to_string(), seconds_to_time_string)
}

fn minutes(minutes: Option<u64>) -> String {
  duration(minutes.and_then(|m| m.checked_mul(60)))
}

fn clock(timestamp: Option<&str>) -> Result<String, OuraError> {
  match timestamp {
    Some(ts) => clock_time(ts),
    None => Ok(MISSING_VALUE.to_string()),
  }
}

fn no_data(section: &str, day: &str) -> String {
  format!("There is no {} data available for {}", section, day)
}

/// ---------------------------------------------------------------------------
/// Section Rendering
/// ---------------------------------------------------------------------------

/// All lines for one import, in section order. Never empty: every section
/// yields either its fields or a single "no data" line.
pub fn render_bullets(
  records: &SectionRecords,
  style: BulletStyle,
  day: &str,
) -> Result<Vec<String>, OuraError> {
  let mut bullets = Vec::new();

  match records {
    SectionRecords::Vendor {
      sleep,
      activity,
      readiness,
    } => {
      vendor_sleep(&mut bullets, sleep.as_ref(), style, day)?;
      vendor_activity(&mut bullets, activity.as_ref(), style, day)?;
      vendor_readiness(&mut bullets, readiness.as_ref(), style, day);
    }
    SectionRecords::Proxy {
      daily_sleep,
      sleep,
      activity,
      readiness,
    } => {
      daily_sleep_lines(&mut bullets, daily_sleep.as_ref(), style, day);
      sleep_lines(&mut bullets, sleep.as_ref(), style, day)?;
      daily_activity_lines(&mut bullets, activity.as_ref(), style, day)?;
      daily_readiness_lines(&mut bullets, readiness.as_ref(), style, day);
    }
  }

  Ok(bullets)
}

fn daily_sleep_lines(
  bullets: &mut Vec<String>,
  record: Option<&DailySleepData>,
  style: BulletStyle,
  day: &str,
) {
  let Some(daily_sleep) = record else {
    bullets.push(no_data("Daily Sleep", day));
    return;
  };

  let contributors = &daily_sleep.contributors;
  bullets.extend([
    style.bullet("Sleep Score", value(daily_sleep.score)),
    style.bullet("Sleep Efficiency", value(contributors.efficiency)),
    style.bullet("Deep Sleep", duration(contributors.deep_sleep)),
    style.bullet("Rem Sleep", duration(contributors.rem_sleep)),
  ]);
}

fn sleep_lines(
  bullets: &mut Vec<String>,
  record: Option<&SleepData>,
  style: BulletStyle,
  day: &str,
) -> Result<(), OuraError> {
  let Some(sleep) = record else {
    bullets.push(no_data("Sleep", day));
    return Ok(());
  };

  bullets.extend([
    style.bullet("Bedtime Start", clock(sleep.bedtime_start.as_deref())?),
    style.bullet("Bedtime End", clock(sleep.bedtime_end.as_deref())?),
    style.bullet("Sleep Duration", duration(sleep.time_in_bed)),
    style.bullet("Total Sleep", duration(sleep.total_sleep_duration)),
    style.bullet("Total Awake", duration(sleep.awake_time)),
    style.bullet("Sleep Latency", duration(sleep.latency)),
    style.bullet("Light Sleep", duration(sleep.light_sleep_duration)),
    style.bullet("Resting Heart Rate", value(sleep.lowest_heart_rate)),
    style.bullet("Average Heart Rate", sleep.heart_rate.average()),
    style.bullet("Heart Rate Variability", value(sleep.average_hrv)),
  ]);
  Ok(())
}

fn daily_activity_lines(
  bullets: &mut Vec<String>,
  record: Option<&DailyActivityData>,
  style: BulletStyle,
  day: &str,
) -> Result<(), OuraError> {
  let Some(activity) = record else {
    bullets.push(no_data("Daily Activity", day));
    return Ok(());
  };

  bullets.extend([
    style.bullet("Day", clock(activity.day.as_deref())?),
    style.bullet("Activity Score", value(activity.score)),
    style.bullet("Low Activity", minutes(activity.low_activity_time)),
    style.bullet("Medium Activity", minutes(activity.medium_activity_time)),
    style.bullet("High Activity", minutes(activity.high_activity_time)),
    style.bullet("Rest Activity", minutes(activity.resting_time)),
    style.bullet("Steps", value(activity.steps)),
  ]);
  Ok(())
}

fn daily_readiness_lines(
  bullets: &mut Vec<String>,
  record: Option<&DailyReadinessData>,
  style: BulletStyle,
  day: &str,
) {
  match record {
    Some(readiness) => bullets.push(style.bullet("Readiness Score", value(readiness.score))),
    None => bullets.push(no_data("Daily Readiness", day)),
  }
}

fn vendor_sleep(
  bullets: &mut Vec<String>,
  record: Option<&VendorSleep>,
  style: BulletStyle,
  day: &str,
) -> Result<(), OuraError> {
  let Some(sleep) = record else {
    bullets.push(no_data("sleep", day));
    return Ok(());
  };

  bullets.extend([
    style.bullet("Bedtime Start", clock(sleep.bedtime_start.as_deref())?),
    style.bullet("Bedtime End", clock(sleep.bedtime_end.as_deref())?),
    style.bullet("Sleep Duration", duration(sleep.duration)),
    style.bullet("Total Sleep", duration(sleep.total)),
    style.bullet("Total Awake", duration(sleep.awake)),
    style.bullet("Sleep Latency", duration(sleep.onset_latency)),
    style.bullet("Rem Sleep", duration(sleep.rem)),
    style.bullet("Light Sleep", duration(sleep.light)),
    style.bullet("Deep Sleep", duration(sleep.deep)),
    style.bullet("Resting Heart Rate", value(sleep.hr_lowest)),
    style.bullet("Average Heart Rate", value(sleep.hr_average)),
    style.bullet("Heart Rate Variability", value(sleep.rmssd)),
    style.bullet("Sleep Score", value(sleep.score)),
  ]);
  Ok(())
}

fn vendor_activity(
  bullets: &mut Vec<String>,
  record: Option<&VendorActivity>,
  style: BulletStyle,
  day: &str,
) -> Result<(), OuraError> {
  let Some(activity) = record else {
    bullets.push(no_data("activity", day));
    return Ok(());
  };

  bullets.extend([
    style.bullet("Day Start", clock(activity.day_start.as_deref())?),
    style.bullet("Day End", clock(activity.day_end.as_deref())?),
    style.bullet("Activity Score", value(activity.score)),
    style.bullet("Low Activity", minutes(activity.low)),
    style.bullet("Medium Activity", minutes(activity.medium)),
    style.bullet("High Activity", minutes(activity.high)),
    style.bullet("Rest Activity", minutes(activity.rest)),
    style.bullet("Steps", value(activity.steps)),
    style.bullet("Total Calories", value(activity.cal_total)),
  ]);
  Ok(())
}

fn vendor_readiness(
  bullets: &mut Vec<String>,
  record: Option<&VendorReadiness>,
  style: BulletStyle,
  day: &str,
) {
  match record {
    Some(readiness) => bullets.push(style.bullet("Readiness Score", value(readiness.score))),
    None => bullets.push(no_data("readiness", day)),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
