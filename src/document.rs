//! The host notes document: blocks addressed by uid, each with a parent and
//! a position among its siblings.

use crate::db::{DbPool, StoreError};
use crate::models::Block;
use async_trait::async_trait;
use uuid::Uuid;

const UID_LENGTH: usize = 9;

/// Reads and writes the importer needs from the host document model.
#[async_trait]
pub trait DocumentStore: Send + Sync {
  async fn parent_uid(&self, uid: &str) -> Result<Option<String>, StoreError>;

  /// Title of the page `uid` lives on (the page's own title for a page)
  async fn page_title(&self, uid: &str) -> Result<Option<String>, StoreError>;

  async fn order(&self, uid: &str) -> Result<i64, StoreError>;

  async fn children_count(&self, parent_uid: &str) -> Result<i64, StoreError>;

  async fn update_block(&self, uid: &str, text: &str) -> Result<(), StoreError>;

  /// Shift siblings at or after `from_order` down by `count` positions,
  /// leaving `from_order..from_order + count` free.
  async fn reserve_positions(
    &self,
    parent_uid: &str,
    from_order: i64,
    count: i64,
  ) -> Result<(), StoreError>;

  /// Create a child at exactly `order`. Returns the new uid.
  async fn create_block(&self, parent_uid: &str, order: i64, text: &str)
    -> Result<String, StoreError>;

  /// Return the uid of the page titled `title`, creating it as `uid` if absent.
  async fn ensure_page(&self, uid: &str, title: &str) -> Result<String, StoreError>;

  async fn find_blocks_containing(&self, needle: &str) -> Result<Vec<Block>, StoreError>;
}

pub fn new_uid() -> String {
  let mut uid = Uuid::new_v4().simple().to_string();
  uid.truncate(UID_LENGTH);
  uid
}

/// ---------------------------------------------------------------------------
/// SQLite Document Store
/// ---------------------------------------------------------------------------

pub struct SqliteDocumentStore {
  db: DbPool,
}

impl SqliteDocumentStore {
  pub fn new(db: DbPool) -> Self {
    Self { db }
  }

  pub async fn page_by_title(&self, title: &str) -> Result<Option<Block>, StoreError> {
    let page = sqlx::query_as::<_, Block>(
      "SELECT uid, parent_uid, title, text, ord FROM blocks WHERE title = ?1",
    )
    .bind(title)
    .fetch_optional(&self.db)
    .await?;

    Ok(page)
  }

  pub async fn children(&self, parent_uid: &str) -> Result<Vec<Block>, StoreError> {
    let children = sqlx::query_as::<_, Block>(
      "SELECT uid, parent_uid, title, text, ord FROM blocks
       WHERE parent_uid = ?1 ORDER BY ord, rowid",
    )
    .bind(parent_uid)
    .fetch_all(&self.db)
    .await?;

    Ok(children)
  }

  /// Append a block after the last child of `parent_uid`
  pub async fn append_block(&self, parent_uid: &str, text: &str) -> Result<String, StoreError> {
    let order = self.children_count(parent_uid).await?;
    self.create_block(parent_uid, order, text).await
  }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
  async fn parent_uid(&self, uid: &str) -> Result<Option<String>, StoreError> {
    let row: Option<(Option<String>,)> =
      sqlx::query_as("SELECT parent_uid FROM blocks WHERE uid = ?1")
        .bind(uid)
        .fetch_optional(&self.db)
        .await?;

    row
      .map(|(parent,)| parent)
      .ok_or_else(|| StoreError::NotFound(uid.to_string()))
  }

  async fn page_title(&self, uid: &str) -> Result<Option<String>, StoreError> {
    let title: Option<(Option<String>,)> = sqlx::query_as(
      r#"
      WITH RECURSIVE ancestors(uid, parent_uid, title) AS (
        SELECT uid, parent_uid, title FROM blocks WHERE uid = ?1
        UNION ALL
        SELECT b.uid, b.parent_uid, b.title
        FROM blocks b JOIN ancestors a ON b.uid = a.parent_uid
      )
      SELECT title FROM ancestors WHERE parent_uid IS NULL
      "#,
    )
    .bind(uid)
    .fetch_optional(&self.db)
    .await?;

    Ok(title.and_then(|(t,)| t))
  }

  async fn order(&self, uid: &str) -> Result<i64, StoreError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT ord FROM blocks WHERE uid = ?1")
      .bind(uid)
      .fetch_optional(&self.db)
      .await?;

    row
      .map(|(ord,)| ord)
      .ok_or_else(|| StoreError::NotFound(uid.to_string()))
  }

  async fn children_count(&self, parent_uid: &str) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks WHERE parent_uid = ?1")
      .bind(parent_uid)
      .fetch_one(&self.db)
      .await?;

    Ok(count)
  }

  async fn update_block(&self, uid: &str, text: &str) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE blocks SET text = ?2 WHERE uid = ?1")
      .bind(uid)
      .bind(text)
      .execute(&self.db)
      .await?;

    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound(uid.to_string()));
    }
    Ok(())
  }

  async fn reserve_positions(
    &self,
    parent_uid: &str,
    from_order: i64,
    count: i64,
  ) -> Result<(), StoreError> {
    sqlx::query("UPDATE blocks SET ord = ord + ?3 WHERE parent_uid = ?1 AND ord >= ?2")
      .bind(parent_uid)
      .bind(from_order)
      .bind(count)
      .execute(&self.db)
      .await?;

    Ok(())
  }

  async fn create_block(
    &self,
    parent_uid: &str,
    order: i64,
    text: &str,
  ) -> Result<String, StoreError> {
    let uid = new_uid();

    sqlx::query("INSERT INTO blocks (uid, parent_uid, text, ord) VALUES (?1, ?2, ?3, ?4)")
      .bind(&uid)
      .bind(parent_uid)
      .bind(text)
      .bind(order)
      .execute(&self.db)
      .await?;

    Ok(uid)
  }

  async fn ensure_page(&self, uid: &str, title: &str) -> Result<String, StoreError> {
    sqlx::query("INSERT OR IGNORE INTO blocks (uid, parent_uid, title, text, ord) VALUES (?1, NULL, ?2, '', 0)")
      .bind(uid)
      .bind(title)
      .execute(&self.db)
      .await?;

    let page_uid: String = sqlx::query_scalar("SELECT uid FROM blocks WHERE title = ?1")
      .bind(title)
      .fetch_one(&self.db)
      .await?;

    Ok(page_uid)
  }

  async fn find_blocks_containing(&self, needle: &str) -> Result<Vec<Block>, StoreError> {
    let blocks = sqlx::query_as::<_, Block>(
      "SELECT uid, parent_uid, title, text, ord FROM blocks
       WHERE instr(text, ?1) > 0 ORDER BY parent_uid, ord",
    )
    .bind(needle)
    .fetch_all(&self.db)
    .await?;

    Ok(blocks)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;

  #[test]
  fn test_new_uid_length() {
    let a = new_uid();
    assert_eq!(a.len(), 9);
    assert_ne!(a, new_uid());
  }

  #[tokio::test]
  async fn test_page_title_walks_to_root() {
    let pool = setup_test_db().await;
    let store = SqliteDocumentStore::new(pool.clone());

    let page = seed_page(&pool, "October 18th, 2026").await;
    let parent = seed_block(&pool, &page, 0, "parent").await;
    let child = seed_block(&pool, &parent, 0, "child").await;

    assert_eq!(
      store.page_title(&child).await.unwrap().as_deref(),
      Some("October 18th, 2026")
    );
    assert_eq!(
      store.page_title(&page).await.unwrap().as_deref(),
      Some("October 18th, 2026")
    );
    assert_eq!(store.parent_uid(&child).await.unwrap(), Some(parent));
    assert_eq!(store.parent_uid(&page).await.unwrap(), None);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_missing_block_is_not_found() {
    let pool = setup_test_db().await;
    let store = SqliteDocumentStore::new(pool.clone());

    assert!(matches!(store.parent_uid("nope").await, Err(StoreError::NotFound(_))));
    assert!(matches!(store.order("nope").await, Err(StoreError::NotFound(_))));
    assert!(matches!(
      store.update_block("nope", "x").await,
      Err(StoreError::NotFound(_))
    ));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_reserve_then_create_in_any_order() {
    let pool = setup_test_db().await;
    let store = SqliteDocumentStore::new(pool.clone());

    let page = seed_page(&pool, "Inbox").await;
    seed_block(&pool, &page, 0, "a").await;
    seed_block(&pool, &page, 1, "d").await;

    store.reserve_positions(&page, 1, 2).await.unwrap();
    store.create_block(&page, 2, "c").await.unwrap();
    store.create_block(&page, 1, "b").await.unwrap();

    let texts: Vec<(i64, String)> = store
      .children(&page)
      .await
      .unwrap()
      .into_iter()
      .map(|b| (b.ord, b.text))
      .collect();
    assert_eq!(
      texts,
      vec![
        (0, "a".to_string()),
        (1, "b".to_string()),
        (2, "c".to_string()),
        (3, "d".to_string()),
      ]
    );

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_ensure_page_is_idempotent() {
    let pool = setup_test_db().await;
    let store = SqliteDocumentStore::new(pool.clone());

    let first = store.ensure_page("10-19-2026", "October 19th, 2026").await.unwrap();
    let second = store.ensure_page("other", "October 19th, 2026").await.unwrap();
    assert_eq!(first, "10-19-2026");
    assert_eq!(second, "10-19-2026");

    let uid = store.append_block(&first, "first").await.unwrap();
    assert_eq!(store.order(&uid).await.unwrap(), 0);
    assert_eq!(store.children_count(&first).await.unwrap(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_find_blocks_containing() {
    let pool = setup_test_db().await;
    let store = SqliteDocumentStore::new(pool.clone());

    let page = seed_page(&pool, "Inbox").await;
    let button = seed_block(&pool, &page, 0, "{{Import Oura Ring}}").await;
    seed_block(&pool, &page, 1, "plain text").await;

    let found = store.find_blocks_containing("{{").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uid, button);

    teardown_test_db(pool).await;
  }
}
