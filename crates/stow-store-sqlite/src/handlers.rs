//! Artifact handlers over the SQLite document tables.

use std::sync::Arc;

use async_trait::async_trait;
use stow_core::{
  handler::{ArtifactHandler, ArtifactType, HandlerError, HandlerRegistry},
  project::ProjectCoordinates,
  version::VersionId,
};

use crate::SqliteStore;

/// Owns the `entities` table rows with a given `versioned` flag.
///
/// One table backs two collections: unversioned rows are
/// [`ArtifactType::Entities`], versioned rows are
/// [`ArtifactType::VersionedEntities`].
#[derive(Clone)]
pub struct EntitiesHandler {
  store:     SqliteStore,
  versioned: bool,
}

impl EntitiesHandler {
  pub fn new(store: SqliteStore) -> Self { Self { store, versioned: false } }

  pub fn versioned(store: SqliteStore) -> Self { Self { store, versioned: true } }
}

#[async_trait]
impl ArtifactHandler for EntitiesHandler {
  fn artifact_type(&self) -> ArtifactType {
    if self.versioned { ArtifactType::VersionedEntities } else { ArtifactType::Entities }
  }

  async fn count_documents(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<u64, HandlerError> {
    Ok(self.store.count_entities(project, version, self.versioned).await?)
  }

  async fn delete_documents(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<u64, HandlerError> {
    Ok(self.store.delete_entities(project, version, self.versioned).await?)
  }
}

/// Owns the `file_generations` table.
#[derive(Clone)]
pub struct FileGenerationsHandler {
  store: SqliteStore,
}

impl FileGenerationsHandler {
  pub fn new(store: SqliteStore) -> Self { Self { store } }
}

#[async_trait]
impl ArtifactHandler for FileGenerationsHandler {
  fn artifact_type(&self) -> ArtifactType { ArtifactType::FileGenerations }

  async fn count_documents(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<u64, HandlerError> {
    Ok(self.store.count_file_generations(project, version).await?)
  }

  async fn delete_documents(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<u64, HandlerError> {
    Ok(self.store.delete_file_generations(project, version).await?)
  }
}

/// The handler this backend provides for `artifact_type`, if any.
pub fn handler_for(
  store: &SqliteStore,
  artifact_type: &ArtifactType,
) -> Option<Arc<dyn ArtifactHandler>> {
  match artifact_type {
    ArtifactType::Entities => Some(Arc::new(EntitiesHandler::new(store.clone()))),
    ArtifactType::VersionedEntities => {
      Some(Arc::new(EntitiesHandler::versioned(store.clone())))
    }
    ArtifactType::FileGenerations => {
      Some(Arc::new(FileGenerationsHandler::new(store.clone())))
    }
    ArtifactType::Custom(_) => None,
  }
}

/// A registry with a handler for every built-in artifact type.
pub fn default_registry(store: &SqliteStore) -> HandlerRegistry {
  ArtifactType::BUILT_IN
    .iter()
    .filter_map(|t| handler_for(store, t))
    .fold(HandlerRegistry::new(), HandlerRegistry::with_handler)
}
