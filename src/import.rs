//! The import pipeline: resolve the day, fetch it, format it and write it
//! under the block that triggered the import.

use crate::config::PluginConfig;
use crate::dates::{resolve_target_date, DateWindow, QueryDay};
use crate::db::StoreError;
use crate::document::DocumentStore;
use crate::format::{render_bullets, BulletStyle};
use crate::oura::{BiometricsSource, OuraError};
use crate::settings::{OuraSettings, SettingsReader};
use chrono::Local;
use futures_util::future::try_join_all;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

/// ---------------------------------------------------------------------------
/// User-Facing Messages
/// ---------------------------------------------------------------------------

pub const MISSING_TOKEN_MESSAGE: &str =
  r#"Error: Could not find the required "Token" attribute configured in the oura-ring settings."#;
pub const UNEXPECTED_MESSAGE: &str = "Unexpected Error thrown. Email support@roamjs.com for help!";

/// Why an import ended without data. Each variant is written into the
/// triggering block instead of the bullets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportFailure {
  #[error("no token configured")]
  MissingCredential,

  #[error("token rejected by the API")]
  Unauthorized { token: String },

  #[error("unexpected failure: {0}")]
  Unexpected(String),
}

impl ImportFailure {
  fn from_oura(error: OuraError, token: &str) -> Self {
    match error {
      OuraError::Unauthorized => ImportFailure::Unauthorized {
        token: token.to_string(),
      },
      other => ImportFailure::Unexpected(other.to_string()),
    }
  }

  pub fn message(&self) -> String {
    match self {
      ImportFailure::MissingCredential => MISSING_TOKEN_MESSAGE.to_string(),
      ImportFailure::Unauthorized { token } => format!(
        "The token used ({}) is not authorized to access oura ring.",
        token
      ),
      ImportFailure::Unexpected(_) => UNEXPECTED_MESSAGE.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportReport {
  /// `created` holds the uids of the new sibling blocks, in document order
  Imported { day: String, created: Vec<String> },
  Failed { message: String },
}

/// ---------------------------------------------------------------------------
/// Location Locks
/// ---------------------------------------------------------------------------

/// One async mutex per parent block, so concurrent imports under the same
/// parent apply their writes one after another. An entry lives only while
/// someone holds or waits for it.
#[derive(Default)]
struct LocationLocks {
  inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LocationLocks {
  async fn lock(&self, location: &str) -> LocationGuard<'_> {
    let lock = {
      let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
      locks.entry(location.to_string()).or_default().clone()
    };
    LocationGuard {
      locks: self,
      location: location.to_string(),
      guard: Some(lock.lock_owned().await),
    }
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

/// Held for the duration of a write under one parent. Dropping it releases
/// the mutex and forgets the entry when nobody else is waiting on it.
struct LocationGuard<'a> {
  locks: &'a LocationLocks,
  location: String,
  guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LocationGuard<'_> {
  fn drop(&mut self) {
    let mut locks = self.locks.inner.lock().unwrap_or_else(PoisonError::into_inner);
    drop(self.guard.take());
    if locks
      .get(&self.location)
      .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
      locks.remove(&self.location);
    }
  }
}

/// ---------------------------------------------------------------------------
/// Importer
/// ---------------------------------------------------------------------------

pub struct Importer {
  documents: Arc<dyn DocumentStore>,
  settings: Arc<dyn SettingsReader>,
  source: BiometricsSource,
  query_day: QueryDay,
  client: Client,
  locks: LocationLocks,
}

impl Importer {
  pub fn new(
    documents: Arc<dyn DocumentStore>,
    settings: Arc<dyn SettingsReader>,
    source: BiometricsSource,
    query_day: QueryDay,
  ) -> Self {
    Self {
      documents,
      settings,
      source,
      query_day,
      client: Client::new(),
      locks: LocationLocks::default(),
    }
  }

  pub fn from_config(
    config: &PluginConfig,
    documents: Arc<dyn DocumentStore>,
    settings: Arc<dyn SettingsReader>,
  ) -> Self {
    Self::new(
      documents,
      settings,
      BiometricsSource::from_config(config),
      config.query_day,
    )
  }

  pub fn documents(&self) -> &Arc<dyn DocumentStore> {
    &self.documents
  }

  /// Append an empty block at the end of `parent_uid`. Serialized with the
  /// imports writing under the same parent so the new block's position
  /// stays its own.
  pub async fn append_block(&self, parent_uid: &str) -> Result<String, StoreError> {
    let _guard = self.locks.lock(parent_uid).await;
    let order = self.documents.children_count(parent_uid).await?;
    self.documents.create_block(parent_uid, order, "").await
  }

  /// Run the whole pipeline for `block_uid`. Fetch and format failures are
  /// written into the block; only document storage errors are returned.
  pub async fn import_oura_ring(&self, block_uid: &str) -> Result<ImportReport, StoreError> {
    let parent_uid = self
      .documents
      .parent_uid(block_uid)
      .await?
      .ok_or_else(|| StoreError::NotFound(format!("parent of {}", block_uid)))?;

    let _guard = self.locks.lock(&parent_uid).await;

    let page_title = self.documents.page_title(block_uid).await?;
    let settings = OuraSettings::load(self.settings.as_ref()).await?;

    let Some(token) = settings.token else {
      return self.fail(block_uid, ImportFailure::MissingCredential).await;
    };

    let resolved = resolve_target_date(page_title.as_deref(), Local::now().date_naive());
    let window = DateWindow::for_day(resolved, self.query_day);
    let day = window.start_param();
    info!(block_uid, window = %window, "Importing Oura Ring data");

    let style = BulletStyle::new(settings.use_attributes);
    let bullets = match self.fetch_bullets(&window, &token, style).await {
      Ok(bullets) => bullets,
      Err(e) => return self.fail(block_uid, ImportFailure::from_oura(e, &token)).await,
    };

    let created = self.write_bullets(block_uid, &parent_uid, &bullets).await?;
    info!(block_uid, lines = bullets.len(), "Oura Ring data written");

    Ok(ImportReport::Imported { day, created })
  }

  async fn fetch_bullets(
    &self,
    window: &DateWindow,
    token: &str,
    style: BulletStyle,
  ) -> Result<Vec<String>, OuraError> {
    let records = self
      .source
      .fetch_biometrics(&self.client, window, token)
      .await?;
    render_bullets(&records, style, &window.start_param())
  }

  /// Overwrite the trigger with the first line and insert the rest right
  /// after it. Line `i` lands at the trigger's order plus `i`.
  async fn write_bullets(
    &self,
    block_uid: &str,
    parent_uid: &str,
    bullets: &[String],
  ) -> Result<Vec<String>, StoreError> {
    let Some((first, rest)) = bullets.split_first() else {
      return Ok(Vec::new());
    };

    let base = self.documents.order(block_uid).await?;
    if !rest.is_empty() {
      self
        .documents
        .reserve_positions(parent_uid, base + 1, rest.len() as i64)
        .await?;
    }

    let creations = rest.iter().enumerate().map(|(offset, text)| {
      self
        .documents
        .create_block(parent_uid, base + 1 + offset as i64, text)
    });

    let (_, created) = tokio::try_join!(
      self.documents.update_block(block_uid, first),
      try_join_all(creations),
    )?;

    Ok(created)
  }

  async fn fail(
    &self,
    block_uid: &str,
    failure: ImportFailure,
  ) -> Result<ImportReport, StoreError> {
    warn!(block_uid, reason = %failure, "Oura Ring import failed");

    let message = failure.message();
    self.documents.update_block(block_uid, &message).await?;
    Ok(ImportReport::Failed { message })
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
