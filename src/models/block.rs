use serde::{Deserialize, Serialize};

/// A node of the notes document. Pages are root blocks that carry a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Block {
  pub uid: String,
  pub parent_uid: Option<String>,
  pub title: Option<String>,
  pub text: String,
  pub ord: i64,
}

