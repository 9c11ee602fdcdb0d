//! Error type for `stow-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] stow_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to record a version or document for a project the catalog
  /// does not know.
  #[error("project not found: {0}")]
  ProjectNotFound(stow_core::project::ProjectCoordinates),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
