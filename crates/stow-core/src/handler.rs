//! Artifact-type handlers and the registry the purge service dispatches
//! through.
//!
//! Every document collection (entities, file generations, ...) is owned by
//! exactly one [`ArtifactHandler`]. The purge service never knows what a
//! collection holds; it only asks each registered handler to count or delete
//! the documents of a `(group, artifact, version)` scope. Supporting a new
//! artifact type means registering another handler.

use std::{collections::BTreeMap, convert::Infallible, fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, project::ProjectCoordinates, version::VersionId};

// ─── ArtifactType ────────────────────────────────────────────────────────────

/// Tag naming a document collection.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum ArtifactType {
  /// Entities extracted from a version's build.
  Entities,
  /// Entities published with explicit version pinning.
  VersionedEntities,
  /// Files generated from a version's entities.
  FileGenerations,
  /// A collection outside the built-in set.
  Custom(String),
}

impl ArtifactType {
  /// The built-in types, in registration order.
  pub const BUILT_IN: [ArtifactType; 3] =
    [Self::Entities, Self::VersionedEntities, Self::FileGenerations];

  pub fn as_str(&self) -> &str {
    match self {
      Self::Entities => "entities",
      Self::VersionedEntities => "versioned_entities",
      Self::FileGenerations => "file_generations",
      Self::Custom(name) => name,
    }
  }
}

impl FromStr for ArtifactType {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Infallible> {
    Ok(match s {
      "entities" => Self::Entities,
      "versioned_entities" => Self::VersionedEntities,
      "file_generations" => Self::FileGenerations,
      other => Self::Custom(other.to_owned()),
    })
  }
}

impl fmt::Display for ArtifactType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl From<String> for ArtifactType {
  fn from(s: String) -> Self {
    match s.parse() {
      Ok(t) => t,
      Err(never) => match never {},
    }
  }
}

impl From<ArtifactType> for String {
  fn from(t: ArtifactType) -> Self { t.as_str().to_owned() }
}

// ─── Handler trait ───────────────────────────────────────────────────────────

/// Error raised by a handler's backing store. Handlers are heterogeneous, so
/// the purge service only ever records its message.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Owns one document collection and can count or delete a version's share
/// of it.
///
/// `async_trait` rather than native `async fn` because handlers are stored as
/// trait objects in the [`HandlerRegistry`].
#[async_trait]
pub trait ArtifactHandler: Send + Sync {
  /// The collection this handler owns.
  fn artifact_type(&self) -> ArtifactType;

  /// Number of documents stored for `version` of `project`.
  async fn count_documents(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<u64, HandlerError>;

  /// Delete every document stored for `version` of `project` and return how
  /// many were removed. Deleting an empty scope succeeds with `0`.
  async fn delete_documents(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<u64, HandlerError>;
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Handlers keyed by the artifact type they own.
///
/// Iteration order is the `ArtifactType` order, so purge reports are stable.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
  handlers: BTreeMap<ArtifactType, Arc<dyn ArtifactHandler>>,
}

impl HandlerRegistry {
  pub fn new() -> Self { Self::default() }

  /// Register `handler` under its own artifact type, returning the handler it
  /// replaced, if any.
  pub fn register(
    &mut self,
    handler: Arc<dyn ArtifactHandler>,
  ) -> Option<Arc<dyn ArtifactHandler>> {
    self.handlers.insert(handler.artifact_type(), handler)
  }

  /// Builder-style [`register`](Self::register).
  pub fn with_handler(mut self, handler: Arc<dyn ArtifactHandler>) -> Self {
    self.register(handler);
    self
  }

  pub fn get(&self, artifact_type: &ArtifactType) -> Option<&Arc<dyn ArtifactHandler>> {
    self.handlers.get(artifact_type)
  }

  pub fn contains(&self, artifact_type: &ArtifactType) -> bool {
    self.handlers.contains_key(artifact_type)
  }

  pub fn types(&self) -> impl Iterator<Item = &ArtifactType> { self.handlers.keys() }

  pub fn iter(&self) -> impl Iterator<Item = (&ArtifactType, &Arc<dyn ArtifactHandler>)> {
    self.handlers.iter()
  }

  pub fn len(&self) -> usize { self.handlers.len() }

  pub fn is_empty(&self) -> bool { self.handlers.is_empty() }

  /// Fail if any of `present` (types holding documents for `version`) has no
  /// handler. Skipping them would leave orphaned documents behind.
  pub fn ensure_covers<'a>(
    &self,
    present: impl IntoIterator<Item = &'a ArtifactType>,
    version: &VersionId,
  ) -> Result<()> {
    for artifact_type in present {
      if !self.contains(artifact_type) {
        return Err(Error::UnregisteredHandler {
          artifact_type: artifact_type.clone(),
          version:       version.to_string(),
        });
      }
    }
    Ok(())
  }
}

impl fmt::Debug for HandlerRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.handlers.keys()).finish()
  }
}
