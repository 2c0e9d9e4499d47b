//! Entry points that start an import: inline buttons and the palette command.

use crate::dates::{date_to_page_title, date_to_page_uid};
use crate::db::StoreError;
use crate::document::DocumentStore;
use crate::import::{ImportReport, Importer};
use crate::models::Block;
use chrono::Local;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const OURA_COMMAND: &str = "Import Oura Ring";
pub const PALETTE_LABEL: &str = "Import Oura Ring Data";

/// Commands the extension registers with the host palette
pub fn registered_commands() -> Vec<&'static str> {
  vec![PALETTE_LABEL]
}

/// ---------------------------------------------------------------------------
/// Button Observer
/// ---------------------------------------------------------------------------

/// Recognizes `{{Import Oura Ring}}` style buttons in block text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonObserver {
  shortcut: String,
  attribute: String,
}

impl Default for ButtonObserver {
  fn default() -> Self {
    Self::new(OURA_COMMAND)
  }
}

impl ButtonObserver {
  pub fn new(shortcut: &str) -> Self {
    Self {
      shortcut: shortcut.to_string(),
      attribute: shortcut.replace(char::is_whitespace, "-"),
    }
  }

  /// Hyphenated form of the command name used as the button's attribute
  pub fn attribute(&self) -> &str {
    &self.attribute
  }

  pub fn matches_label(&self, label: &str) -> bool {
    let label = label.trim();
    let label = label
      .strip_prefix("[[")
      .and_then(|l| l.strip_suffix("]]"))
      .unwrap_or(label)
      .trim();

    label.eq_ignore_ascii_case(&self.shortcut) || label.eq_ignore_ascii_case(&self.attribute)
  }

  pub fn is_button(&self, text: &str) -> bool {
    button_labels(text).any(|label| self.matches_label(label))
  }

  /// Every block in the document carrying this button
  pub async fn scan(&self, documents: &dyn DocumentStore) -> Result<Vec<Block>, StoreError> {
    let candidates = documents.find_blocks_containing("{{").await?;
    Ok(
      candidates
        .into_iter()
        .filter(|block| self.is_button(&block.text))
        .collect(),
    )
  }
}

/// Labels of all `{{...}}` buttons in `text`, in order of appearance
pub fn button_labels(text: &str) -> impl Iterator<Item = &str> {
  let mut rest = text;
  std::iter::from_fn(move || {
    let start = rest.find("{{")? + 2;
    let len = rest[start..].find("}}")?;
    let label = &rest[start..start + len];
    rest = &rest[start + len + 2..];
    Some(label)
  })
}

/// ---------------------------------------------------------------------------
/// Trigger
/// ---------------------------------------------------------------------------

/// Starts imports on the runtime without making the caller wait.
#[derive(Clone)]
pub struct Trigger {
  importer: Arc<Importer>,
  observer: ButtonObserver,
}

impl Trigger {
  pub fn new(importer: Arc<Importer>) -> Self {
    Self {
      importer,
      observer: ButtonObserver::default(),
    }
  }

  pub fn importer(&self) -> &Arc<Importer> {
    &self.importer
  }

  pub fn observer(&self) -> &ButtonObserver {
    &self.observer
  }

  /// A click on an import button inside `block_uid`
  pub fn click_button(&self, block_uid: &str) -> JoinHandle<Option<ImportReport>> {
    self.spawn_import(block_uid.to_string())
  }

  /// The palette action: append an empty block to the open page or block
  /// (today's daily page when nothing is open) and import into it.
  /// Returns the new block's uid along with the running import.
  pub async fn run_palette_command(
    &self,
    open_uid: Option<&str>,
  ) -> Result<(String, JoinHandle<Option<ImportReport>>), StoreError> {
    let documents = self.importer.documents();

    let parent_uid = match open_uid {
      Some(uid) => uid.to_string(),
      None => {
        let today = Local::now().date_naive();
        documents
          .ensure_page(&date_to_page_uid(today), &date_to_page_title(today))
          .await?
      }
    };

    let block_uid = self.importer.append_block(&parent_uid).await?;
    info!(parent_uid = %parent_uid, block_uid = %block_uid, "Palette import started");

    let handle = self.spawn_import(block_uid.clone());
    Ok((block_uid, handle))
  }

  fn spawn_import(&self, block_uid: String) -> JoinHandle<Option<ImportReport>> {
    let importer = self.importer.clone();
    tokio::spawn(async move {
      match importer.import_oura_ring(&block_uid).await {
        Ok(report) => Some(report),
        Err(e) => {
          error!(block_uid = %block_uid, error = %e, "Import could not update the document");
          None
        }
      }
    })
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dates::QueryDay;
  use crate::document::SqliteDocumentStore;
  use crate::import::MISSING_TOKEN_MESSAGE;
  use crate::oura::BiometricsSource;
  use crate::settings::{SqliteSettingsStore, TOKEN_KEY};
  use crate::test_utils::*;
  use mockito::Matcher;

  fn trigger_for(pool: &sqlx::SqlitePool, domain: String) -> Trigger {
    let importer = Importer::new(
      Arc::new(SqliteDocumentStore::new(pool.clone())),
      Arc::new(SqliteSettingsStore::new(pool.clone())),
      BiometricsSource::ProxyV2 { domain },
      QueryDay::Same,
    );
    Trigger::new(Arc::new(importer))
  }

  #[test]
  fn test_attribute_replaces_whitespace() {
    assert_eq!(ButtonObserver::default().attribute(), "Import-Oura-Ring");
    assert_eq!(registered_commands(), vec!["Import Oura Ring Data"]);
  }

  #[test]
  fn test_button_labels() {
    let labels: Vec<&str> = button_labels("a {{one}} b {{[[two]]}} c {{unclosed").collect();
    assert_eq!(labels, vec!["one", "[[two]]"]);
  }

  #[test]
  fn test_recognized_button_forms() {
    let observer = ButtonObserver::default();
    assert!(observer.is_button("{{Import Oura Ring}}"));
    assert!(observer.is_button("sleep log {{[[Import Oura Ring]]}}"));
    assert!(observer.is_button("{{import-oura-ring}}"));
    assert!(!observer.is_button("{{Import Strava}}"));
    assert!(!observer.is_button("Import Oura Ring"));
  }

  #[tokio::test]
  async fn test_scan_finds_button_blocks() {
    let pool = setup_test_db().await;
    let store = SqliteDocumentStore::new(pool.clone());

    let page = seed_page(&pool, "October 18th, 2026").await;
    let button = seed_block(&pool, &page, 0, "{{Import Oura Ring}}").await;
    seed_block(&pool, &page, 1, "{{TODO}} call mum").await;

    let found = ButtonObserver::default().scan(&store).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uid, button);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_click_without_token_writes_error_into_button_block() {
    let pool = setup_test_db().await;
    let store = SqliteDocumentStore::new(pool.clone());
    let page = seed_page(&pool, "October 18th, 2026").await;
    let button = seed_block(&pool, &page, 0, "{{Import Oura Ring}}").await;

    let trigger = trigger_for(&pool, "http://127.0.0.1:9".into());
    let report = trigger.click_button(&button).await.unwrap();

    assert!(matches!(report, Some(ImportReport::Failed { .. })));
    let children = store.children(&page).await.unwrap();
    assert_eq!(children[0].text, MISSING_TOKEN_MESSAGE);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_palette_appends_block_to_open_page() {
    let pool = setup_test_db().await;
    let settings = SqliteSettingsStore::new(pool.clone());
    settings.set(TOKEN_KEY, "tok").await.unwrap();
    let store = SqliteDocumentStore::new(pool.clone());

    let mut server = mockito::Server::new_async().await;
    let _m = server
      .mock("GET", "/apps/oura")
      .match_query(Matcher::UrlEncoded("startDate".into(), "2026-10-18".into()))
      .with_status(200)
      .with_body(r#"{"data":[]}"#)
      .expect(4)
      .create_async()
      .await;

    let page = seed_page(&pool, "October 18th, 2026").await;
    seed_block(&pool, &page, 0, "existing").await;

    let trigger = trigger_for(&pool, server.url());
    let (block_uid, handle) = trigger.run_palette_command(Some(page.as_str())).await.unwrap();
    handle.await.unwrap();

    let children = store.children(&page).await.unwrap();
    assert_eq!(children.len(), 5);
    assert_eq!(children[0].text, "existing");
    assert_eq!(children[1].uid, block_uid);
    assert_eq!(
      children[1].text,
      "There is no Daily Sleep data available for 2026-10-18"
    );

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_palette_without_open_page_uses_todays_daily_page() {
    let pool = setup_test_db().await;
    let store = SqliteDocumentStore::new(pool.clone());

    let trigger = trigger_for(&pool, "http://127.0.0.1:9".into());
    let (block_uid, handle) = trigger.run_palette_command(None).await.unwrap();
    handle.await.unwrap();

    let today = Local::now().date_naive();
    let page = store
      .page_by_title(&date_to_page_title(today))
      .await
      .unwrap()
      .expect("daily page created");
    assert_eq!(page.uid, date_to_page_uid(today));
    assert_eq!(store.parent_uid(&block_uid).await.unwrap(), Some(page.uid));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_two_palette_commands_on_one_page_stay_contiguous() {
    let pool = setup_test_db().await;
    let settings = SqliteSettingsStore::new(pool.clone());
    settings.set(TOKEN_KEY, "tok").await.unwrap();
    let store = SqliteDocumentStore::new(pool.clone());

    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_proxy_endpoints(&mut server, "tok", "2026-10-18", "2026-10-19").await;

    let page = seed_page(&pool, "October 18th, 2026").await;
    let trigger = trigger_for(&pool, server.url());

    let (a, b) = tokio::join!(
      trigger.run_palette_command(Some(page.as_str())),
      trigger.run_palette_command(Some(page.as_str()))
    );
    let (_, first) = a.unwrap();
    let (_, second) = b.unwrap();
    first.await.unwrap();
    second.await.unwrap();

    let children = store.children(&page).await.unwrap();
    let orders: Vec<i64> = children.iter().map(|b| b.ord).collect();
    assert_eq!(orders, (0..44).collect::<Vec<i64>>());

    let starts: Vec<usize> = children
      .iter()
      .enumerate()
      .filter(|(_, b)| b.text == "Sleep Score:: 85")
      .map(|(i, _)| i)
      .collect();
    assert_eq!(starts, vec![0, 22]);

    teardown_test_db(pool).await;
  }
}
