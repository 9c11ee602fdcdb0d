//! Error types for `stow-core`.

use thiserror::Error;

use crate::handler::ArtifactType;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed version identifier: {0:?}")]
  MalformedVersion(String),

  #[error("no handler registered for {artifact_type} documents of version {version}")]
  UnregisteredHandler {
    artifact_type: ArtifactType,
    version:       String,
  },

  #[error("catalog error: {0}")]
  Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error raised while reading or updating the catalog.
  pub fn catalog<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Catalog(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
