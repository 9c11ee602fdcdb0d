//! Error type for `stow-housekeeper`.

use stow_core::handler::ArtifactType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Purge(#[from] stow_core::Error),

  #[error("no handler implementation for artifact type {0}")]
  UnsupportedArtifactType(ArtifactType),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
