//! The `VersionCatalog` trait.
//!
//! The catalog is the durable record of every project and the releases it has
//! published. It is implemented by storage backends (e.g.
//! `stow-store-sqlite`); the purge service depends on this abstraction only.

use std::future::Future;

use crate::{
  handler::ArtifactType,
  project::{ProjectCoordinates, StoreProject, VersionRecord},
  version::{ReleaseVersion, VersionId},
};

/// Abstraction over a catalog backend.
///
/// Release listings never contain the snapshot branch: it is a permanent slot
/// of every project rather than a record in its version list.
///
/// All methods return `Send` futures so the trait can be driven from a
/// multi-threaded runtime.
pub trait VersionCatalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Projects ──────────────────────────────────────────────────────────

  /// Every project in the catalog, ordered by coordinates.
  fn list_projects(
    &self,
  ) -> impl Future<Output = Result<Vec<StoreProject>, Self::Error>> + Send + '_;

  /// Look up a project. Returns `None` if it is not in the catalog.
  fn get_project<'a>(
    &'a self,
    project: &'a ProjectCoordinates,
  ) -> impl Future<Output = Result<Option<StoreProject>, Self::Error>> + Send + 'a;

  // ── Versions ──────────────────────────────────────────────────────────

  /// All release records of a project, evicted ones included, oldest first
  /// by semantic precedence (see [`VersionRecord::sort_oldest_first`]).
  /// Unknown projects yield an empty list.
  fn list_versions<'a>(
    &'a self,
    project: &'a ProjectCoordinates,
  ) -> impl Future<Output = Result<Vec<VersionRecord>, Self::Error>> + Send + 'a;

  /// Look up a single release record.
  fn find_version<'a>(
    &'a self,
    project: &'a ProjectCoordinates,
    version: &'a ReleaseVersion,
  ) -> impl Future<Output = Result<Option<VersionRecord>, Self::Error>> + Send + 'a;

  /// The newest release by semantic precedence, evicted or not.
  fn latest_version<'a>(
    &'a self,
    project: &'a ProjectCoordinates,
  ) -> impl Future<Output = Result<Option<ReleaseVersion>, Self::Error>> + Send + 'a;

  /// Flag a release as evicted. Returns `false` if there is no such record.
  /// A record that is already evicted keeps its original eviction time.
  fn mark_evicted<'a>(
    &'a self,
    project: &'a ProjectCoordinates,
    version: &'a ReleaseVersion,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove a release record. Returns `false` if there was none.
  fn remove_version<'a>(
    &'a self,
    project: &'a ProjectCoordinates,
    version: &'a ReleaseVersion,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Documents ─────────────────────────────────────────────────────────

  /// The artifact types that currently hold documents for `version`.
  ///
  /// Used to detect collections no registered handler would clean up.
  fn document_types<'a>(
    &'a self,
    project: &'a ProjectCoordinates,
    version: &'a VersionId,
  ) -> impl Future<Output = Result<Vec<ArtifactType>, Self::Error>> + Send + 'a;
}
