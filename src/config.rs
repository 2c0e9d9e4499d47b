//! Process configuration read from the environment.

use crate::dates::QueryDay;
use crate::oura::{ApiVersion, OuraError};
use std::env;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const PRODUCTION_PROXY_DOMAIN: &str = "https://api.samepage.network";
const DEVELOPMENT_PROXY_DOMAIN: &str = "http://localhost:3003";
const OURA_V1_API_BASE: &str = "https://api.ouraring.com/v1";
const DEFAULT_DB_PATH: &str = "oura-notes.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
  pub api_version: ApiVersion,
  pub proxy_domain: String,
  pub vendor_base_url: String,
  pub query_day: QueryDay,
  pub db_path: String,
}

impl Default for PluginConfig {
  fn default() -> Self {
    Self {
      api_version: ApiVersion::V2,
      proxy_domain: PRODUCTION_PROXY_DOMAIN.to_string(),
      vendor_base_url: OURA_V1_API_BASE.to_string(),
      query_day: QueryDay::Same,
      db_path: DEFAULT_DB_PATH.to_string(),
    }
  }
}

impl PluginConfig {
  pub fn from_env() -> Result<Self, OuraError> {
    Self::from_env_with(|k| env::var(k).ok())
  }

  /// Reads configuration through `get` so tests can supply values without
  /// touching the process environment.
  pub fn from_env_with<F>(mut get: F) -> Result<Self, OuraError>
  where
    F: FnMut(&str) -> Option<String>,
  {
    let api_version = match get("OURA_API_VERSION") {
      Some(v) => v.parse()?,
      None => ApiVersion::V2,
    };

    let development = get("OURA_NOTES_ENV")
      .map(|v| v.eq_ignore_ascii_case("development"))
      .unwrap_or(false);

    let proxy_domain = get("OURA_PROXY_DOMAIN").unwrap_or_else(|| {
      if development {
        DEVELOPMENT_PROXY_DOMAIN.to_string()
      } else {
        PRODUCTION_PROXY_DOMAIN.to_string()
      }
    });

    let query_day = match get("OURA_QUERY_DAY") {
      Some(v) => v.parse()?,
      None => QueryDay::Same,
    };

    Ok(Self {
      api_version,
      proxy_domain,
      vendor_base_url: get("OURA_V1_BASE_URL").unwrap_or_else(|| OURA_V1_API_BASE.to_string()),
      query_day,
      db_path: get("OURA_NOTES_DB").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
