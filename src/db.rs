use crate::config::PluginConfig;
use crate::document::SqliteDocumentStore;
use crate::import::Importer;
use crate::settings::SqliteSettingsStore;
use crate::trigger::Trigger;
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use tracing::info;

pub type DbPool = SqlitePool;

/// Errors from the host's settings and document storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Block not found: {0}")]
  NotFound(String),

  #[error("Invalid value for setting '{key}': {value}")]
  InvalidSetting { key: String, value: String },

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),
}

impl Serialize for StoreError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// Application state shared by every trigger surface
pub struct AppState {
  pub db: DbPool,
  pub documents: Arc<SqliteDocumentStore>,
  pub settings: Arc<SqliteSettingsStore>,
  pub trigger: Trigger,
}

impl AppState {
  pub fn new(db: DbPool, config: &PluginConfig) -> Self {
    let documents = Arc::new(SqliteDocumentStore::new(db.clone()));
    let settings = Arc::new(SqliteSettingsStore::new(db.clone()));
    let importer = Importer::from_config(config, documents.clone(), settings.clone());

    Self {
      db,
      documents,
      settings,
      trigger: Trigger::new(Arc::new(importer)),
    }
  }
}

/// Open (creating if needed) the SQLite file at `path` and run migrations
pub async fn connect(path: &str) -> Result<DbPool, sqlx::Error> {
  let db_url = format!("sqlite://{}?mode=rwc", path);

  info!(path, "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  Ok(pool)
}

/// Stored in the host application's data dir: <app data>/oura-notes.db
#[cfg(feature = "tauri-plugin")]
pub async fn initialize_db<R: tauri::Runtime>(
  app: &tauri::AppHandle<R>,
) -> Result<DbPool, Box<dyn std::error::Error>> {
  use tauri::Manager;

  let data_dir = app
    .path()
    .app_data_dir()
    .map_err(|e| format!("Failed to get app data dir: {}", e))?;

  std::fs::create_dir_all(&data_dir)?;

  let db_path = data_dir.join("oura-notes.db");
  Ok(connect(&db_path.display().to_string()).await?)
}
