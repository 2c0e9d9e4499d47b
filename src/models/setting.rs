use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SettingRow {
  pub key: String,
  pub value: String,
  pub updated_at: Option<DateTime<Utc>>,
}
