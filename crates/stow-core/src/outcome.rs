//! The report every purge operation returns.
//!
//! Handler failures are data, not errors: one store being unavailable must not
//! hide what the other handlers did, so every failure is collected here and
//! handed back alongside the successes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{handler::ArtifactType, project::ProjectCoordinates};

/// A single version of a single project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectVersion {
  #[serde(flatten)]
  pub coordinates: ProjectCoordinates,
  pub version_id:  String,
}

impl ProjectVersion {
  pub fn new(coordinates: &ProjectCoordinates, version_id: impl ToString) -> Self {
    Self { coordinates: coordinates.clone(), version_id: version_id.to_string() }
  }
}

/// A handler that could not delete its documents for one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeFailure {
  #[serde(flatten)]
  pub target:        ProjectVersion,
  pub artifact_type: ArtifactType,
  pub message:       String,
}

/// A catalog read or update that failed for one version. Whatever the
/// handlers already removed stays removed; the version's record is left as
/// it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFailure {
  #[serde(flatten)]
  pub target:  ProjectVersion,
  pub message: String,
}

/// A project a pass could not process at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFailure {
  #[serde(flatten)]
  pub coordinates: ProjectCoordinates,
  pub message:     String,
}

/// Drift the purge left for ingestion to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedVersions {
  #[serde(flatten)]
  pub coordinates:  ProjectCoordinates,
  /// Upstream versions missing locally; re-ingestion is not a purge concern.
  #[serde(default)]
  pub not_in_store: Vec<String>,
  /// Versions whose content differs from upstream.
  #[serde(default)]
  pub conflicting:  Vec<String>,
  /// Reported missing upstream but never deleted: the snapshot branch.
  #[serde(default)]
  pub retained:     Vec<String>,
}

/// Aggregated result of an eviction, deletion, or reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
  /// Documents removed, per artifact type.
  pub deleted_documents: BTreeMap<ArtifactType, u64>,
  /// Versions newly marked evicted.
  pub evicted:           Vec<ProjectVersion>,
  /// Versions removed from the catalog.
  pub deleted_versions:  Vec<ProjectVersion>,
  pub unresolved:        Vec<UnresolvedVersions>,
  /// Handler deletions that failed.
  pub failures:          Vec<PurgeFailure>,
  #[serde(default)]
  pub catalog_failures:  Vec<CatalogFailure>,
  #[serde(default)]
  pub project_failures:  Vec<ProjectFailure>,
  /// Projects left alone because another pass held them.
  #[serde(default)]
  pub skipped:           Vec<ProjectCoordinates>,
}

impl PurgeOutcome {
  pub fn new() -> Self { Self::default() }

  pub fn record_deleted(&mut self, artifact_type: &ArtifactType, count: u64) {
    *self.deleted_documents.entry(artifact_type.clone()).or_default() += count;
  }

  /// Documents of `artifact_type` removed so far.
  pub fn deleted(&self, artifact_type: &ArtifactType) -> u64 {
    self.deleted_documents.get(artifact_type).copied().unwrap_or(0)
  }

  pub fn total_deleted(&self) -> u64 { self.deleted_documents.values().sum() }

  /// An outcome reporting only that `project` was skipped.
  pub fn skipped(project: &ProjectCoordinates) -> Self {
    Self { skipped: vec![project.clone()], ..Self::default() }
  }

  pub fn has_failures(&self) -> bool {
    !self.failures.is_empty()
      || !self.catalog_failures.is_empty()
      || !self.project_failures.is_empty()
  }

  /// `true` if the pass changed nothing and reported nothing.
  pub fn is_empty(&self) -> bool {
    self.total_deleted() == 0
      && self.evicted.is_empty()
      && self.deleted_versions.is_empty()
      && self.unresolved.is_empty()
      && !self.has_failures()
      && self.skipped.is_empty()
  }

  /// Fold `other` into this outcome.
  pub fn merge(&mut self, other: Self) {
    for (artifact_type, count) in other.deleted_documents {
      *self.deleted_documents.entry(artifact_type).or_default() += count;
    }
    self.evicted.extend(other.evicted);
    self.deleted_versions.extend(other.deleted_versions);
    self.unresolved.extend(other.unresolved);
    self.failures.extend(other.failures);
    self.catalog_failures.extend(other.catalog_failures);
    self.project_failures.extend(other.project_failures);
    self.skipped.extend(other.skipped);
  }
}
