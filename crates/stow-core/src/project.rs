//! Projects and the version records the catalog keeps for them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, version::ReleaseVersion};

/// The branch every project's snapshot documents are built from.
pub const DEFAULT_BRANCH: &str = "master";

/// `(group_id, artifact_id)`; uniquely identifies a project.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProjectCoordinates {
  pub group_id:    String,
  pub artifact_id: String,
}

impl ProjectCoordinates {
  pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
    Self { group_id: group_id.into(), artifact_id: artifact_id.into() }
  }
}

impl fmt::Display for ProjectCoordinates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.group_id, self.artifact_id)
  }
}

/// A project known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProject {
  /// Identifier of the project in the upstream repository.
  pub project_id:     String,
  #[serde(flatten)]
  pub coordinates:    ProjectCoordinates,
  /// Branch backing the mutable snapshot slot.
  pub default_branch: String,
}

/// One release a project has published.
///
/// An evicted record keeps its place in listings but owns no documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
  /// The identifier exactly as stored; see [`VersionRecord::release`].
  pub version_id: String,
  pub evicted:    bool,
  pub evicted_at: Option<DateTime<Utc>>,
}

impl VersionRecord {
  pub fn new(version_id: impl Into<String>) -> Self {
    Self { version_id: version_id.into(), evicted: false, evicted_at: None }
  }

  /// Parse the stored identifier as a release.
  pub fn release(&self) -> Result<ReleaseVersion> { self.version_id.parse() }

  /// Order `records` oldest first by semantic precedence. Identifiers that
  /// do not parse sort ahead of every release, keeping their relative order.
  pub fn sort_oldest_first(records: &mut [VersionRecord]) {
    records.sort_by_key(|record| record.release().ok());
  }
}
