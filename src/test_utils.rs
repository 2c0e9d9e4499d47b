//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seeded pages and blocks
//! - Mock Oura API responses

use crate::document::new_uid;
use mockito::{Matcher, Mock, ServerGuard};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Insert a page and return its uid
pub async fn seed_page(pool: &SqlitePool, title: &str) -> String {
  let uid = new_uid();
  sqlx::query("INSERT INTO blocks (uid, parent_uid, title, text, ord) VALUES (?1, NULL, ?2, '', 0)")
    .bind(&uid)
    .bind(title)
    .execute(pool)
    .await
    .expect("Failed to seed page");
  uid
}

/// Insert a block under `parent_uid` at `ord` and return its uid
pub async fn seed_block(pool: &SqlitePool, parent_uid: &str, ord: i64, text: &str) -> String {
  let uid = new_uid();
  sqlx::query("INSERT INTO blocks (uid, parent_uid, text, ord) VALUES (?1, ?2, ?3, ?4)")
    .bind(&uid)
    .bind(parent_uid)
    .bind(text)
    .bind(ord)
    .execute(pool)
    .await
    .expect("Failed to seed block");
  uid
}

/// ---------------------------------------------------------------------------
/// Mock API Bodies
/// ---------------------------------------------------------------------------

pub const DAILY_SLEEP_BODY: &str = r#"{"data":[{"score":85,"contributors":{"efficiency":92,"deep_sleep":5400,"rem_sleep":3661}}]}"#;

pub const SLEEP_BODY: &str = r#"{"data":[{
  "time_in_bed": 28800,
  "bedtime_start": "2026-10-17T23:15:00-07:00",
  "bedtime_end": "2026-10-18T07:15:30-07:00",
  "total_sleep_duration": 26100,
  "awake_time": 2700,
  "latency": 540,
  "light_sleep_duration": 14400,
  "lowest_heart_rate": 48,
  "heart_rate": {"interval": 300, "items": [50, 55, null, 57]},
  "average_hrv": 61
}]}"#;

pub const DAILY_ACTIVITY_BODY: &str = r#"{"data":[{"day":"2026-10-18","score":74,"low_activity_time":5,"medium_activity_time":45,"high_activity_time":0,"resting_time":600,"steps":9000}]}"#;

pub const DAILY_READINESS_BODY: &str = r#"{"data":[{"score":77}]}"#;

pub const VENDOR_SLEEP_BODY: &str = r#"{"sleep":[{
  "summary_date": "2026-10-16",
  "bedtime_start": "2026-10-16T23:30:00+02:00",
  "bedtime_end": "2026-10-17T07:00:00+02:00",
  "duration": 27000,
  "total": 25200,
  "awake": 1800,
  "onset_latency": 600,
  "rem": 5400,
  "light": 12600,
  "deep": 7200,
  "hr_lowest": 47,
  "hr_average": 52.5,
  "rmssd": 58,
  "score": 81
}]}"#;

pub const VENDOR_ACTIVITY_BODY: &str = r#"{"activity":[{"summary_date":"2026-10-17","day_start":"2026-10-17T04:00:00+02:00","day_end":"2026-10-18T03:59:59+02:00","score":88,"low":240,"medium":30,"high":5,"rest":480,"steps":12000,"cal_total":2450}]}"#;

pub const VENDOR_READINESS_BODY: &str = r#"{"readiness":[{"summary_date":"2026-10-17","score":70}]}"#;

/// ---------------------------------------------------------------------------
/// Mock Servers
/// ---------------------------------------------------------------------------

/// One mock per proxy data type, each expecting the full query for the window
pub async fn mock_proxy_endpoints(
  server: &mut ServerGuard,
  token: &str,
  start: &str,
  end: &str,
) -> Vec<Mock> {
  let mut mocks = Vec::new();

  for (data_type, body) in [
    ("daily_sleep", DAILY_SLEEP_BODY),
    ("daily_activity", DAILY_ACTIVITY_BODY),
    ("daily_readiness", DAILY_READINESS_BODY),
    ("sleep", SLEEP_BODY),
  ] {
    let mock = server
      .mock("GET", "/apps/oura")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("startDate".into(), start.into()),
        Matcher::UrlEncoded("endDate".into(), end.into()),
        Matcher::UrlEncoded("token".into(), token.into()),
        Matcher::UrlEncoded("dataType".into(), data_type.into()),
      ]))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body)
      .create_async()
      .await;
    mocks.push(mock);
  }

  mocks
}

/// One mock per vendor v1 endpoint under `/v1`
pub async fn mock_vendor_endpoints(
  server: &mut ServerGuard,
  token: &str,
  start: &str,
  end: &str,
) -> Vec<Mock> {
  let mut mocks = Vec::new();

  for (endpoint, body) in [
    ("sleep", VENDOR_SLEEP_BODY),
    ("activity", VENDOR_ACTIVITY_BODY),
    ("readiness", VENDOR_READINESS_BODY),
  ] {
    let mock = server
      .mock("GET", format!("/v1/{}", endpoint).as_str())
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("start".into(), start.into()),
        Matcher::UrlEncoded("end".into(), end.into()),
        Matcher::UrlEncoded("access_token".into(), token.into()),
      ]))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body)
      .create_async()
      .await;
    mocks.push(mock);
  }

  mocks
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('blocks', 'settings')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seeded_blocks_hang_off_page() {
    let pool = setup_test_db().await;

    let page = seed_page(&pool, "Inbox").await;
    seed_block(&pool, &page, 0, "a").await;
    seed_block(&pool, &page, 1, "b").await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks WHERE parent_uid = ?1")
      .bind(&page)
      .fetch_one(&pool)
      .await
      .expect("Failed to count blocks");
    assert_eq!(count, 2);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_bodies_are_valid_json() {
    for body in [
      DAILY_SLEEP_BODY,
      SLEEP_BODY,
      DAILY_ACTIVITY_BODY,
      DAILY_READINESS_BODY,
      VENDOR_SLEEP_BODY,
      VENDOR_ACTIVITY_BODY,
      VENDOR_READINESS_BODY,
    ] {
      serde_json::from_str::<serde_json::Value>(body).expect("valid json");
    }
  }
}
