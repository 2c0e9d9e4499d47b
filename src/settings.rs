//! Extension settings: the panel shown to the user and the values read back
//! at the start of every import.

use crate::db::{DbPool, StoreError};
use crate::models::SettingRow;
use async_trait::async_trait;
use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Settings Panel
/// ---------------------------------------------------------------------------

pub const TAB_TITLE: &str = "oura-ring";
pub const TOKEN_KEY: &str = "token";
pub const USE_ATTRIBUTES_KEY: &str = "use-attributes";

#[derive(Debug, Clone, Serialize)]
pub struct SettingsPanel {
  pub tab_title: &'static str,
  pub settings: Vec<SettingDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingDescriptor {
  pub id: &'static str,
  pub name: &'static str,
  pub description: &'static str,
  pub action: SettingAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SettingAction {
  Input { placeholder: &'static str },
  Switch,
}

pub fn panel() -> SettingsPanel {
  SettingsPanel {
    tab_title: TAB_TITLE,
    settings: vec![
      SettingDescriptor {
        id: TOKEN_KEY,
        name: "Token",
        description: "Your Oura Ring personal access token, accessible from https://cloud.ouraring.com/personal-access-tokens.",
        action: SettingAction::Input { placeholder: "xxxxxx" },
      },
      SettingDescriptor {
        id: USE_ATTRIBUTES_KEY,
        name: "Use plain text",
        description: "Toggles the usage of attributes on import.",
        action: SettingAction::Switch,
      },
    ],
  }
}

/// ---------------------------------------------------------------------------
/// Reading Settings
/// ---------------------------------------------------------------------------

/// Read-only view of the host's persistent key/value settings
#[async_trait]
pub trait SettingsReader: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Settings as seen by one import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OuraSettings {
  pub token: Option<String>,
  pub use_attributes: bool,
}

impl OuraSettings {
  pub async fn load(reader: &dyn SettingsReader) -> Result<Self, StoreError> {
    let token = reader
      .get(TOKEN_KEY)
      .await?
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty());

    let use_attributes = reader
      .get(USE_ATTRIBUTES_KEY)
      .await?
      .and_then(|v| parse_switch(&v))
      .unwrap_or(false);

    Ok(Self {
      token,
      use_attributes,
    })
  }
}

fn parse_switch(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "true" | "1" | "on" | "yes" => Some(true),
    "false" | "0" | "off" | "no" | "" => Some(false),
    _ => None,
  }
}

/// ---------------------------------------------------------------------------
/// SQLite Settings Store
/// ---------------------------------------------------------------------------

pub struct SqliteSettingsStore {
  db: DbPool,
}

impl SqliteSettingsStore {
  pub fn new(db: DbPool) -> Self {
    Self { db }
  }

  /// Write one panel setting. Only the panel's keys are accepted and the
  /// switch must be a boolean.
  pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let value = match key {
      TOKEN_KEY => value.trim().to_string(),
      USE_ATTRIBUTES_KEY => parse_switch(value)
        .ok_or_else(|| StoreError::InvalidSetting {
          key: key.to_string(),
          value: value.to_string(),
        })?
        .to_string(),
      _ => {
        return Err(StoreError::InvalidSetting {
          key: key.to_string(),
          value: value.to_string(),
        })
      }
    };

    sqlx::query(
      r#"
      INSERT INTO settings (key, value)
      VALUES (?1, ?2)
      ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = CURRENT_TIMESTAMP
      "#,
    )
    .bind(key)
    .bind(&value)
    .execute(&self.db)
    .await?;

    Ok(())
  }

  pub async fn all(&self) -> Result<Vec<SettingRow>, StoreError> {
    let rows = sqlx::query_as::<_, SettingRow>(
      "SELECT key, value, updated_at FROM settings ORDER BY key",
    )
    .fetch_all(&self.db)
    .await?;

    Ok(rows)
  }
}

#[async_trait]
impl SettingsReader for SqliteSettingsStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
      .bind(key)
      .fetch_optional(&self.db)
      .await?;

    Ok(value)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
