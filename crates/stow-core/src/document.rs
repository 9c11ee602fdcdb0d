//! Documents stored per version in the artifact collections.
//!
//! Parsing and validating these is the ingestion pipeline's job; the purge
//! core only needs their scope `(group, artifact, version)`.

use serde::{Deserialize, Serialize};

use crate::{project::ProjectCoordinates, version::VersionId};

/// A model element extracted from a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
  #[serde(flatten)]
  pub coordinates:     ProjectCoordinates,
  pub version_id:      VersionId,
  /// Fully-qualified element path, unique within a version.
  pub entity_path:     String,
  pub classifier_path: String,
  pub content:         serde_json::Value,
  /// Published with explicit version pinning; owned by the
  /// `versioned_entities` collection rather than `entities`.
  pub versioned:       bool,
}

/// A file generated from a version's entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGeneration {
  #[serde(flatten)]
  pub coordinates:     ProjectCoordinates,
  pub version_id:      VersionId,
  /// Path of the generated file, unique within a version.
  pub path:            String,
  pub generation_type: String,
  pub content:         String,
}

/// Entity counts split by the kind of version that owns them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCounts {
  /// Entities belonging to immutable releases.
  pub version_documents:  u64,
  /// Entities belonging to the snapshot branch.
  pub revision_documents: u64,
}
