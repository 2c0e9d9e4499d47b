//! Oura Ring data sources for the daily import
//!
//! Two sources exist for the same day of data: the vendor's v1 REST API,
//! queried directly with the personal access token, and a proxy that
//! normalizes the v2 `usercollection` endpoints. Both fan out one GET per
//! endpoint and fail as a whole if any request fails.

use crate::config::PluginConfig;
use crate::dates::DateWindow;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const PROXY_PATH: &str = "apps/oura";
const ERROR_BODY_PREVIEW: usize = 500;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OuraError {
  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(String),

  #[error("Token is not authorized to access the Oura API")]
  Unauthorized,

  #[error("API error {status}: {body}")]
  Api { status: u16, body: String },

  #[error("Failed to parse response: {0}")]
  Parse(String),
}

impl From<reqwest::Error> for OuraError {
  fn from(e: reqwest::Error) -> Self {
    // A 401 surfaced through `error_for_status` is still an auth failure
    if e.status() == Some(StatusCode::UNAUTHORIZED) {
      return OuraError::Unauthorized;
    }
    OuraError::Request(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Source Selection
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
  V1,
  V2,
}

impl FromStr for ApiVersion {
  type Err = OuraError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "v1" | "1" => Ok(ApiVersion::V1),
      "v2" | "2" => Ok(ApiVersion::V2),
      other => Err(OuraError::InvalidConfig(format!(
        "OURA_API_VERSION must be 'v1' or 'v2', got '{}'",
        other
      ))),
    }
  }
}

/// Where the day's biometrics come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricsSource {
  /// `{base_url}/{sleep|activity|readiness}?start=&end=&access_token=`
  VendorV1 { base_url: String },
  /// `{domain}/apps/oura?startDate=&endDate=&token=&dataType=`
  ProxyV2 { domain: String },
}

impl BiometricsSource {
  pub fn from_config(config: &PluginConfig) -> Self {
    match config.api_version {
      ApiVersion::V1 => BiometricsSource::VendorV1 {
        base_url: config.vendor_base_url.clone(),
      },
      ApiVersion::V2 => BiometricsSource::ProxyV2 {
        domain: config.proxy_domain.clone(),
      },
    }
  }

  /// Fetch every section for `window` concurrently. Any failed request fails
  /// the whole batch.
  pub async fn fetch_biometrics(
    &self,
    client: &Client,
    window: &DateWindow,
    token: &str,
  ) -> Result<SectionRecords, OuraError> {
    match self {
      BiometricsSource::VendorV1 { base_url } => {
        let (sleep, activity, readiness) = tokio::try_join!(
          fetch_vendor::<VendorSleepResponse>(client, base_url, "sleep", window, token),
          fetch_vendor::<VendorActivityResponse>(client, base_url, "activity", window, token),
          fetch_vendor::<VendorReadinessResponse>(client, base_url, "readiness", window, token),
        )?;

        Ok(SectionRecords::Vendor {
          sleep: sleep.sleep.into_iter().next(),
          activity: activity.activity.into_iter().next(),
          readiness: readiness.readiness.into_iter().next(),
        })
      }
      BiometricsSource::ProxyV2 { domain } => {
        let endpoint = proxy_endpoint(domain)?;
        let (daily_sleep, daily_activity, daily_readiness, sleep) = tokio::try_join!(
          fetch_proxy::<DailySleepData>(client, &endpoint, "daily_sleep", window, token),
          fetch_proxy::<DailyActivityData>(client, &endpoint, "daily_activity", window, token),
          fetch_proxy::<DailyReadinessData>(client, &endpoint, "daily_readiness", window, token),
          fetch_proxy::<SleepData>(client, &endpoint, "sleep", window, token),
        )?;

        Ok(SectionRecords::Proxy {
          daily_sleep: daily_sleep.data.into_iter().next(),
          sleep: sleep.data.into_iter().next(),
          activity: daily_activity.data.into_iter().next(),
          readiness: daily_readiness.data.into_iter().next(),
        })
      }
    }
  }
}

fn proxy_endpoint(domain: &str) -> Result<url::Url, OuraError> {
  url::Url::parse(domain)
    .and_then(|base| base.join(PROXY_PATH))
    .map_err(|e| OuraError::InvalidConfig(format!("Bad proxy domain '{}': {}", domain, e)))
}

/// ---------------------------------------------------------------------------
/// Section Records
/// ---------------------------------------------------------------------------

/// First record of each endpoint for the queried day. `None` means the API
/// had nothing for that day, which is not an error.
#[derive(Debug, Clone)]
pub enum SectionRecords {
  Vendor {
    sleep: Option<VendorSleep>,
    activity: Option<VendorActivity>,
    readiness: Option<VendorReadiness>,
  },
  Proxy {
    daily_sleep: Option<DailySleepData>,
    sleep: Option<SleepData>,
    activity: Option<DailyActivityData>,
    readiness: Option<DailyReadinessData>,
  },
}

/// ---------------------------------------------------------------------------
/// Vendor v1 Data Structures
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct VendorSleepResponse {
  #[serde(default)]
  pub sleep: Vec<VendorSleep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VendorSleep {
  pub summary_date: Option<String>,
  pub bedtime_start: Option<String>, // ISO timestamp with offset
  pub bedtime_end: Option<String>,
  pub duration: Option<u64>,      // seconds in bed
  pub total: Option<u64>,         // seconds asleep
  pub awake: Option<u64>,         // seconds
  pub onset_latency: Option<u64>, // seconds
  pub rem: Option<u64>,           // seconds
  pub light: Option<u64>,         // seconds
  pub deep: Option<u64>,          // seconds
  pub hr_lowest: Option<f64>,
  pub hr_average: Option<f64>,
  pub rmssd: Option<f64>,
  pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct VendorActivityResponse {
  #[serde(default)]
  pub activity: Vec<VendorActivity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VendorActivity {
  pub summary_date: Option<String>,
  pub day_start: Option<String>,
  pub day_end: Option<String>,
  pub score: Option<f64>,
  pub low: Option<u64>,    // minutes
  pub medium: Option<u64>, // minutes
  pub high: Option<u64>,   // minutes
  pub rest: Option<u64>,   // minutes
  pub steps: Option<u64>,
  pub cal_total: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct VendorReadinessResponse {
  #[serde(default)]
  pub readiness: Vec<VendorReadiness>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VendorReadiness {
  pub summary_date: Option<String>,
  pub score: Option<f64>,
}

/// ---------------------------------------------------------------------------
/// Proxy v2 Data Structures
/// ---------------------------------------------------------------------------

/// `{ "data": [...] }` envelope returned for every proxy data type
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
  #[serde(default = "Vec::new")]
  pub data: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DailySleepData {
  pub score: Option<f64>,
  pub contributors: SleepContributors,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SleepContributors {
  pub efficiency: Option<f64>,
  pub deep_sleep: Option<u64>,
  pub rem_sleep: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SleepData {
  pub time_in_bed: Option<u64>, // seconds
  pub bedtime_start: Option<String>,
  pub bedtime_end: Option<String>,
  pub total_sleep_duration: Option<u64>,
  pub awake_time: Option<u64>,
  pub latency: Option<u64>,
  pub light_sleep_duration: Option<u64>,
  pub lowest_heart_rate: Option<f64>,
  pub heart_rate: HeartRateSeries,
  pub average_hrv: Option<f64>,
}

/// Heart rate samples recorded during a sleep period; gaps come back as null
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeartRateSeries {
  pub items: Vec<Option<f64>>,
}

impl HeartRateSeries {
  /// Arithmetic mean with gaps counted as zero. NaN when there are no samples.
  pub fn average(&self) -> f64 {
    let sum: f64 = self.items.iter().map(|v| v.unwrap_or(0.0)).sum();
    sum / self.items.len() as f64
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DailyActivityData {
  pub day: Option<String>, // ISO date (YYYY-MM-DD)
  pub score: Option<f64>,
  pub low_activity_time: Option<u64>, // minutes
  pub medium_activity_time: Option<u64>,
  pub high_activity_time: Option<u64>,
  pub resting_time: Option<u64>,
  pub steps: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DailyReadinessData {
  pub score: Option<f64>,
}

/// ---------------------------------------------------------------------------
/// Oura API Data Fetching
/// ---------------------------------------------------------------------------

async fn fetch_vendor<T: DeserializeOwned>(
  client: &Client,
  base_url: &str,
  endpoint: &str,
  window: &DateWindow,
  token: &str,
) -> Result<T, OuraError> {
  let url = format!("{}/{}", base_url.trim_end_matches('/'), endpoint);
  debug!(endpoint, window = %window, "requesting vendor v1 data");

  let request = client.get(&url).query(&[
    ("start", window.start_param()),
    ("end", window.end_param()),
    ("access_token", token.to_string()),
  ]);

  send_json(request, endpoint).await
}

async fn fetch_proxy<T: DeserializeOwned>(
  client: &Client,
  endpoint: &url::Url,
  data_type: &str,
  window: &DateWindow,
  token: &str,
) -> Result<DataEnvelope<T>, OuraError> {
  debug!(data_type, window = %window, "requesting proxy v2 data");

  let request = client.get(endpoint.clone()).query(&[
    ("startDate", window.start_param()),
    ("endDate", window.end_param()),
    ("token", token.to_string()),
    ("dataType", data_type.to_string()),
  ]);

  send_json(request, data_type).await
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> Result<T, OuraError> {
  let response = request.send().await?;
  let status = response.status();

  if status == StatusCode::UNAUTHORIZED {
    return Err(OuraError::Unauthorized);
  }

  if !status.is_success() {
    let error_text = response.text().await.unwrap_or_default();
    return Err(OuraError::Api {
      status: status.as_u16(),
      body: error_text.chars().take(ERROR_BODY_PREVIEW).collect(),
    });
  }

  let response_text = response.text().await?;
  serde_json::from_str(&response_text)
    .map_err(|e| OuraError::Parse(format!("{} response: {}", what, e)))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
