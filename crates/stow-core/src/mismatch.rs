//! Drift reports produced by reconciling the catalog against the upstream
//! artifact repository.
//!
//! The purge core never fetches these itself; the reconciliation feed hands
//! them over as plain data (typically JSON).

use serde::{Deserialize, Serialize};

use crate::project::ProjectCoordinates;

/// Differences between the versions recorded locally for one project and the
/// versions the upstream repository actually holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMismatch {
  pub project_id:                 String,
  pub group_id:                   String,
  pub artifact_id:                String,
  /// Published upstream but never ingested locally.
  #[serde(default)]
  pub versions_not_in_store:      Vec<String>,
  /// Recorded locally but no longer present upstream.
  #[serde(default)]
  pub versions_not_in_repository: Vec<String>,
  /// Present on both sides with differing content signatures.
  #[serde(default)]
  pub conflicting_versions:       Vec<String>,
}

impl VersionMismatch {
  pub fn new(
    project_id: impl Into<String>,
    group_id: impl Into<String>,
    artifact_id: impl Into<String>,
  ) -> Self {
    Self {
      project_id: project_id.into(),
      group_id: group_id.into(),
      artifact_id: artifact_id.into(),
      ..Self::default()
    }
  }

  pub fn coordinates(&self) -> ProjectCoordinates {
    ProjectCoordinates::new(&self.group_id, &self.artifact_id)
  }

  /// `true` if local and upstream agree.
  pub fn is_clean(&self) -> bool {
    self.versions_not_in_store.is_empty()
      && self.versions_not_in_repository.is_empty()
      && self.conflicting_versions.is_empty()
  }
}
