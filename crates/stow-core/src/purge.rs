//! [`PurgeService`]: retention-based eviction, hard deletion, and
//! reconciliation-driven deletion of project versions.
//!
//! For any version, documents are removed through every registered handler
//! before the catalog is touched. A version whose documents could not all be
//! removed keeps its catalog state, so a later pass retries it. Once a pass
//! has started removing documents, catalog failures are recorded per version
//! in the outcome rather than returned, so earlier work is never hidden.
//!
//! Callers must not run two purge operations on the same project at once;
//! operations on different projects are independent.

use std::sync::Arc;

use crate::{
  Error, Result,
  catalog::VersionCatalog,
  handler::HandlerRegistry,
  mismatch::VersionMismatch,
  outcome::{CatalogFailure, ProjectVersion, PurgeFailure, PurgeOutcome, UnresolvedVersions},
  project::ProjectCoordinates,
  version::{ReleaseVersion, VersionId},
};

pub struct PurgeService<C> {
  catalog:  Arc<C>,
  handlers: HandlerRegistry,
}

impl<C: VersionCatalog> PurgeService<C> {
  pub fn new(catalog: Arc<C>, handlers: HandlerRegistry) -> Self {
    Self { catalog, handlers }
  }

  pub fn catalog(&self) -> &Arc<C> { &self.catalog }

  pub fn handlers(&self) -> &HandlerRegistry { &self.handlers }

  /// Evict all but the `keep` newest releases of `project`.
  ///
  /// Evicted releases lose their documents but stay listed in the catalog
  /// with the evicted flag set. Releases already evicted are skipped, the
  /// snapshot branch is never considered, and a project with at most `keep`
  /// releases is left untouched.
  ///
  /// # Errors
  ///
  /// [`Error::MalformedVersion`] if a stored release identifier cannot be
  /// ordered, [`Error::UnregisteredHandler`] if a candidate holds documents
  /// no handler owns, and [`Error::Catalog`] if the project's releases
  /// cannot be listed.
  pub async fn evict_oldest_versions(
    &self,
    project: &ProjectCoordinates,
    keep: usize,
  ) -> Result<PurgeOutcome> {
    let mut outcome = PurgeOutcome::new();
    if !self.project_exists(project).await? {
      tracing::debug!(%project, "project not in catalog, nothing to evict");
      return Ok(outcome);
    }

    let mut records = self
      .catalog
      .list_versions(project)
      .await
      .map_err(Error::catalog)?
      .into_iter()
      .map(|record| -> Result<_> { Ok((record.release()?, record)) })
      .collect::<Result<Vec<_>>>()?;

    if records.len() <= keep {
      tracing::debug!(%project, versions = records.len(), keep, "within retention");
      return Ok(outcome);
    }

    records.sort_unstable_by_key(|(release, _)| *release);
    let candidates = records.len() - keep;

    for (release, record) in records.into_iter().take(candidates) {
      if record.evicted {
        continue;
      }
      let step = self.evict_release(project, &release, &mut outcome).await;
      record_catalog_failure(&mut outcome, ProjectVersion::new(project, release), step)?;
    }

    Ok(outcome)
  }

  /// Delete every document of `version` and drop its catalog record.
  ///
  /// Deleting the snapshot branch only removes its documents: the branch is a
  /// permanent slot of the project, not a catalog record. Deleting a version
  /// that has nothing left succeeds with an empty outcome.
  ///
  /// Catalog failures are recorded in [`PurgeOutcome::catalog_failures`].
  ///
  /// # Errors
  ///
  /// [`Error::UnregisteredHandler`] if the version holds documents no handler
  /// owns.
  pub async fn delete_version(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<PurgeOutcome> {
    let mut outcome = PurgeOutcome::new();
    let step = self.delete_in_place(project, version, &mut outcome).await;
    record_catalog_failure(&mut outcome, ProjectVersion::new(project, version), step)?;
    Ok(outcome)
  }

  /// Hard-delete every version a reconciliation report found locally but not
  /// upstream, processing `mismatches` in order.
  ///
  /// Versions missing locally, versions with conflicting content and a
  /// reported snapshot branch are listed in [`PurgeOutcome::unresolved`] and
  /// never mutated. All identifiers are validated before anything is
  /// deleted, and a catalog failure on one version does not stop the rest.
  ///
  /// # Errors
  ///
  /// [`Error::MalformedVersion`] if any report names an invalid identifier;
  /// otherwise as [`delete_version`](Self::delete_version).
  pub async fn delete_versions_not_in_repository(
    &self,
    mismatches: &[VersionMismatch],
  ) -> Result<PurgeOutcome> {
    let plans = mismatches
      .iter()
      .map(|mismatch| -> Result<_> {
        let versions = mismatch
          .versions_not_in_repository
          .iter()
          .map(|v| v.parse::<VersionId>())
          .collect::<Result<Vec<_>>>()?;
        Ok((mismatch, versions))
      })
      .collect::<Result<Vec<_>>>()?;

    let mut outcome = PurgeOutcome::new();
    for (mismatch, versions) in plans {
      let project = mismatch.coordinates();
      let mut retained = Vec::new();

      for version in &versions {
        if version.is_snapshot() {
          // The snapshot branch is never published upstream.
          tracing::warn!(%project, "ignoring snapshot branch reported missing upstream");
          retained.push(version.to_string());
          continue;
        }
        let step = self.delete_in_place(&project, version, &mut outcome).await;
        record_catalog_failure(&mut outcome, ProjectVersion::new(&project, version), step)?;
      }

      if !mismatch.versions_not_in_store.is_empty()
        || !mismatch.conflicting_versions.is_empty()
        || !retained.is_empty()
      {
        tracing::info!(
          %project,
          not_in_store = mismatch.versions_not_in_store.len(),
          conflicting = mismatch.conflicting_versions.len(),
          retained = retained.len(),
          "leaving drift for ingestion to resolve"
        );
        outcome.unresolved.push(UnresolvedVersions {
          coordinates:  project,
          not_in_store: mismatch.versions_not_in_store.clone(),
          conflicting:  mismatch.conflicting_versions.clone(),
          retained,
        });
      }
    }

    Ok(outcome)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn evict_release(
    &self,
    project: &ProjectCoordinates,
    release: &ReleaseVersion,
    outcome: &mut PurgeOutcome,
  ) -> Result<()> {
    if self.purge_documents(project, &(*release).into(), outcome).await? {
      self.mark_evicted(project, release, outcome).await?;
    }
    Ok(())
  }

  /// [`delete_version`](Self::delete_version) accumulating into `outcome`.
  async fn delete_in_place(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
    outcome: &mut PurgeOutcome,
  ) -> Result<()> {
    if !self.project_exists(project).await? {
      tracing::debug!(%project, %version, "project not in catalog, nothing to delete");
      return Ok(());
    }

    if !self.purge_documents(project, version, outcome).await? {
      return Ok(());
    }

    if let VersionId::Release(release) = version
      && self
        .catalog
        .remove_version(project, release)
        .await
        .map_err(Error::catalog)?
    {
      tracing::info!(%project, %version, "deleted version");
      outcome.deleted_versions.push(ProjectVersion::new(project, version));
    }
    Ok(())
  }

  async fn project_exists(&self, project: &ProjectCoordinates) -> Result<bool> {
    Ok(
      self
        .catalog
        .get_project(project)
        .await
        .map_err(Error::catalog)?
        .is_some(),
    )
  }

  /// Run every handler's deletion for one version, recording counts and
  /// failures in `outcome`. Returns `true` if every handler succeeded.
  async fn purge_documents(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
    outcome: &mut PurgeOutcome,
  ) -> Result<bool> {
    let present = self
      .catalog
      .document_types(project, version)
      .await
      .map_err(Error::catalog)?;
    self.handlers.ensure_covers(&present, version)?;

    let mut clean = true;
    for (artifact_type, handler) in self.handlers.iter() {
      match handler.delete_documents(project, version).await {
        Ok(count) => {
          tracing::debug!(%project, %version, %artifact_type, count, "deleted documents");
          outcome.record_deleted(artifact_type, count);
        }
        Err(e) => {
          tracing::warn!(
            %project,
            %version,
            %artifact_type,
            error = %e,
            "failed to delete documents"
          );
          outcome.failures.push(PurgeFailure {
            target:        ProjectVersion::new(project, version),
            artifact_type: artifact_type.clone(),
            message:       e.to_string(),
          });
          clean = false;
        }
      }
    }
    Ok(clean)
  }

  async fn mark_evicted(
    &self,
    project: &ProjectCoordinates,
    release: &ReleaseVersion,
    outcome: &mut PurgeOutcome,
  ) -> Result<()> {
    if self
      .catalog
      .mark_evicted(project, release)
      .await
      .map_err(Error::catalog)?
    {
      tracing::info!(%project, version = %release, "evicted version");
      outcome.evicted.push(ProjectVersion::new(project, release));
    }
    Ok(())
  }
}

/// Move a catalog error from one version's `step` into `outcome`; any other
/// error is returned.
fn record_catalog_failure(
  outcome: &mut PurgeOutcome,
  target: ProjectVersion,
  step: Result<()>,
) -> Result<()> {
  match step {
    Err(Error::Catalog(e)) => {
      tracing::warn!(
        project = %target.coordinates,
        version = %target.version_id,
        error = %e,
        "catalog update failed"
      );
      outcome.catalog_failures.push(CatalogFailure { target, message: e.to_string() });
      Ok(())
    }
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
  };

  use async_trait::async_trait;
  use chrono::Utc;

  use super::*;
  use crate::{
    handler::{ArtifactHandler, ArtifactType, HandlerError},
    project::{DEFAULT_BRANCH, StoreProject, VersionRecord},
    version::{SNAPSHOT, releases_oldest_first},
  };

  type DocKey = (ArtifactType, ProjectCoordinates, String);
  type Documents = Arc<Mutex<BTreeMap<DocKey, u64>>>;

  // ─── In-memory catalog ───────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("catalog unavailable")]
  struct CatalogDown;

  #[derive(Default)]
  struct MemoryCatalog {
    projects:  Mutex<BTreeMap<ProjectCoordinates, Vec<VersionRecord>>>,
    documents: Documents,
    /// Projects whose record updates fail.
    failing:   Mutex<BTreeSet<ProjectCoordinates>>,
  }

  impl MemoryCatalog {
    fn add_project(&self, project: &ProjectCoordinates, versions: &[&str]) {
      let records = versions.iter().map(|v| VersionRecord::new(*v)).collect();
      self.projects.lock().unwrap().insert(project.clone(), records);
    }

    fn put_documents(
      &self,
      artifact_type: ArtifactType,
      project: &ProjectCoordinates,
      version: &str,
      count: u64,
    ) {
      self
        .documents
        .lock()
        .unwrap()
        .insert((artifact_type, project.clone(), version.to_owned()), count);
    }

    fn count(&self, artifact_type: ArtifactType, project: &ProjectCoordinates, version: &str) -> u64 {
      self
        .documents
        .lock()
        .unwrap()
        .get(&(artifact_type, project.clone(), version.to_owned()))
        .copied()
        .unwrap_or(0)
    }

    fn fail_updates(&self, project: &ProjectCoordinates) {
      self.failing.lock().unwrap().insert(project.clone());
    }

    fn check_updates(&self, project: &ProjectCoordinates) -> Result<(), CatalogDown> {
      if self.failing.lock().unwrap().contains(project) { Err(CatalogDown) } else { Ok(()) }
    }

    fn record(&self, project: &ProjectCoordinates, version: &str) -> Option<VersionRecord> {
      self.projects.lock().unwrap()[project]
        .iter()
        .find(|r| r.version_id == version)
        .cloned()
    }

    fn listed(&self, project: &ProjectCoordinates) -> Vec<String> {
      let mut records = self.projects.lock().unwrap()[project].clone();
      VersionRecord::sort_oldest_first(&mut records);
      records.into_iter().map(|r| r.version_id).collect()
    }
  }

  impl VersionCatalog for MemoryCatalog {
    type Error = CatalogDown;

    async fn list_projects(&self) -> Result<Vec<StoreProject>, CatalogDown> {
      Ok(
        self
          .projects
          .lock()
          .unwrap()
          .keys()
          .map(|c| StoreProject {
            project_id:     format!("PROD-{}", c.artifact_id),
            coordinates:    c.clone(),
            default_branch: DEFAULT_BRANCH.into(),
          })
          .collect(),
      )
    }

    async fn get_project(
      &self,
      project: &ProjectCoordinates,
    ) -> Result<Option<StoreProject>, CatalogDown> {
      let projects = self.list_projects().await?;
      Ok(projects.into_iter().find(|p| &p.coordinates == project))
    }

    async fn list_versions(
      &self,
      project: &ProjectCoordinates,
    ) -> Result<Vec<VersionRecord>, CatalogDown> {
      let mut records = self.projects.lock().unwrap().get(project).cloned().unwrap_or_default();
      VersionRecord::sort_oldest_first(&mut records);
      Ok(records)
    }

    async fn find_version(
      &self,
      project: &ProjectCoordinates,
      version: &ReleaseVersion,
    ) -> Result<Option<VersionRecord>, CatalogDown> {
      let versions = self.list_versions(project).await?;
      Ok(versions.into_iter().find(|r| r.version_id == version.to_string()))
    }

    async fn latest_version(
      &self,
      project: &ProjectCoordinates,
    ) -> Result<Option<ReleaseVersion>, CatalogDown> {
      let versions = self.list_versions(project).await?;
      let releases = releases_oldest_first(versions.iter().map(|r| &r.version_id))
        .expect("valid test versions");
      Ok(releases.last().copied())
    }

    async fn mark_evicted(
      &self,
      project: &ProjectCoordinates,
      version: &ReleaseVersion,
    ) -> Result<bool, CatalogDown> {
      self.check_updates(project)?;
      let mut projects = self.projects.lock().unwrap();
      let Some(record) = projects
        .get_mut(project)
        .and_then(|rs| rs.iter_mut().find(|r| r.version_id == version.to_string()))
      else {
        return Ok(false);
      };
      if !record.evicted {
        record.evicted = true;
        record.evicted_at = Some(Utc::now());
      }
      Ok(true)
    }

    async fn remove_version(
      &self,
      project: &ProjectCoordinates,
      version: &ReleaseVersion,
    ) -> Result<bool, CatalogDown> {
      self.check_updates(project)?;
      let mut projects = self.projects.lock().unwrap();
      let Some(records) = projects.get_mut(project) else { return Ok(false) };
      let before = records.len();
      records.retain(|r| r.version_id != version.to_string());
      Ok(records.len() != before)
    }

    async fn document_types(
      &self,
      project: &ProjectCoordinates,
      version: &VersionId,
    ) -> Result<Vec<ArtifactType>, CatalogDown> {
      let version = version.to_string();
      Ok(
        self
          .documents
          .lock()
          .unwrap()
          .iter()
          .filter(|((_, p, v), count)| p == project && *v == version && **count > 0)
          .map(|((t, _, _), _)| t.clone())
          .collect(),
      )
    }
  }

  // ─── In-memory handler ───────────────────────────────────────────────────

  struct MemoryHandler {
    artifact_type: ArtifactType,
    documents:     Documents,
    fail:          bool,
  }

  #[async_trait]
  impl ArtifactHandler for MemoryHandler {
    fn artifact_type(&self) -> ArtifactType { self.artifact_type.clone() }

    async fn count_documents(
      &self,
      project: &ProjectCoordinates,
      version: &VersionId,
    ) -> Result<u64, HandlerError> {
      let key = (self.artifact_type.clone(), project.clone(), version.to_string());
      Ok(self.documents.lock().unwrap().get(&key).copied().unwrap_or(0))
    }

    async fn delete_documents(
      &self,
      project: &ProjectCoordinates,
      version: &VersionId,
    ) -> Result<u64, HandlerError> {
      if self.fail {
        return Err("collection unavailable".into());
      }
      let key = (self.artifact_type.clone(), project.clone(), version.to_string());
      Ok(self.documents.lock().unwrap().remove(&key).unwrap_or(0))
    }
  }

  // ─── Fixtures ────────────────────────────────────────────────────────────

  fn project() -> ProjectCoordinates { ProjectCoordinates::new("examples.metadata", "test") }

  fn handler(catalog: &MemoryCatalog, artifact_type: ArtifactType, fail: bool) -> Arc<MemoryHandler> {
    Arc::new(MemoryHandler { artifact_type, documents: catalog.documents.clone(), fail })
  }

  /// Three releases recorded out of order, each with two entities and one
  /// file generation, plus one snapshot entity.
  fn seeded() -> Arc<MemoryCatalog> {
    let catalog = MemoryCatalog::default();
    let p = project();
    catalog.add_project(&p, &["2.3.0", "2.0.0", "2.2.0"]);
    for v in ["2.0.0", "2.2.0", "2.3.0"] {
      catalog.put_documents(ArtifactType::Entities, &p, v, 2);
      catalog.put_documents(ArtifactType::FileGenerations, &p, v, 1);
    }
    catalog.put_documents(ArtifactType::Entities, &p, SNAPSHOT, 1);
    Arc::new(catalog)
  }

  fn service(catalog: &Arc<MemoryCatalog>) -> PurgeService<MemoryCatalog> {
    let handlers = HandlerRegistry::new()
      .with_handler(handler(catalog, ArtifactType::Entities, false))
      .with_handler(handler(catalog, ArtifactType::FileGenerations, false));
    PurgeService::new(catalog.clone(), handlers)
  }

  // ─── Eviction ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn evicts_oldest_and_keeps_them_listed() {
    let catalog = seeded();
    let p = project();

    let outcome = service(&catalog).evict_oldest_versions(&p, 1).await.unwrap();

    assert_eq!(outcome.evicted.len(), 2);
    assert_eq!(outcome.deleted(&ArtifactType::Entities), 4);
    assert_eq!(outcome.deleted(&ArtifactType::FileGenerations), 2);
    assert!(!outcome.has_failures());

    for v in ["2.0.0", "2.2.0"] {
      assert!(catalog.record(&p, v).unwrap().evicted, "{v}");
      assert!(catalog.record(&p, v).unwrap().evicted_at.is_some(), "{v}");
      assert_eq!(catalog.count(ArtifactType::Entities, &p, v), 0);
      assert_eq!(catalog.count(ArtifactType::FileGenerations, &p, v), 0);
    }
    assert!(!catalog.record(&p, "2.3.0").unwrap().evicted);
    assert_eq!(catalog.count(ArtifactType::Entities, &p, "2.3.0"), 2);
    assert_eq!(catalog.count(ArtifactType::Entities, &p, SNAPSHOT), 1);
    assert_eq!(catalog.listed(&p).len(), 3);
  }

  #[tokio::test]
  async fn eviction_orders_by_numeric_precedence() {
    let catalog = Arc::new(MemoryCatalog::default());
    let p = project();
    catalog.add_project(&p, &["2.10.0", "2.9.0"]);

    service(&catalog).evict_oldest_versions(&p, 1).await.unwrap();

    assert!(catalog.record(&p, "2.9.0").unwrap().evicted);
    assert!(!catalog.record(&p, "2.10.0").unwrap().evicted);
  }

  #[tokio::test]
  async fn keeping_at_least_all_versions_is_a_no_op() {
    let catalog = seeded();
    let p = project();

    for keep in [3, 5] {
      let outcome = service(&catalog).evict_oldest_versions(&p, keep).await.unwrap();
      assert!(outcome.is_empty());
    }
    for v in ["2.0.0", "2.2.0", "2.3.0"] {
      assert!(!catalog.record(&p, v).unwrap().evicted);
      assert_eq!(catalog.count(ArtifactType::Entities, &p, v), 2);
    }
  }

  #[tokio::test]
  async fn eviction_is_idempotent() {
    let catalog = seeded();
    let p = project();
    let purge = service(&catalog);

    purge.evict_oldest_versions(&p, 1).await.unwrap();
    let evicted_at = catalog.record(&p, "2.0.0").unwrap().evicted_at;

    let again = purge.evict_oldest_versions(&p, 1).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(catalog.record(&p, "2.0.0").unwrap().evicted_at, evicted_at);

    // Widening retention never restores an evicted release.
    let wider = purge.evict_oldest_versions(&p, 2).await.unwrap();
    assert!(wider.is_empty());
    assert!(catalog.record(&p, "2.2.0").unwrap().evicted);
  }

  #[tokio::test]
  async fn keep_zero_evicts_every_release_but_not_the_snapshot() {
    let catalog = seeded();
    let p = project();

    let outcome = service(&catalog).evict_oldest_versions(&p, 0).await.unwrap();

    assert_eq!(outcome.evicted.len(), 3);
    assert_eq!(catalog.count(ArtifactType::Entities, &p, SNAPSHOT), 1);
  }

  #[tokio::test]
  async fn snapshot_only_project_is_untouched() {
    let catalog = Arc::new(MemoryCatalog::default());
    let p = ProjectCoordinates::new("examples.metadata", "test1");
    catalog.add_project(&p, &[]);
    catalog.put_documents(ArtifactType::Entities, &p, SNAPSHOT, 1);

    let outcome = service(&catalog).evict_oldest_versions(&p, 1).await.unwrap();

    assert!(outcome.is_empty());
    assert!(catalog.listed(&p).is_empty());
    assert_eq!(catalog.count(ArtifactType::Entities, &p, SNAPSHOT), 1);
  }

  #[tokio::test]
  async fn handler_failure_is_isolated_and_blocks_the_flag() {
    let catalog = seeded();
    let p = project();
    let handlers = HandlerRegistry::new()
      .with_handler(handler(&catalog, ArtifactType::Entities, false))
      .with_handler(handler(&catalog, ArtifactType::FileGenerations, true));
    let purge = PurgeService::new(catalog.clone(), handlers);

    let outcome = purge.evict_oldest_versions(&p, 2).await.unwrap();

    assert!(outcome.evicted.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.artifact_type, ArtifactType::FileGenerations);
    assert_eq!(failure.target.version_id, "2.0.0");
    assert_eq!(failure.message, "collection unavailable");

    // The healthy handler still ran.
    assert_eq!(outcome.deleted(&ArtifactType::Entities), 2);
    assert_eq!(catalog.count(ArtifactType::Entities, &p, "2.0.0"), 0);
    assert!(!catalog.record(&p, "2.0.0").unwrap().evicted);
  }

  #[tokio::test]
  async fn unregistered_document_type_is_a_setup_error() {
    let catalog = seeded();
    let p = project();
    catalog.put_documents(ArtifactType::Custom("service_executions".into()), &p, "2.0.0", 1);

    let err = service(&catalog).evict_oldest_versions(&p, 1).await.unwrap_err();

    assert!(matches!(
      err,
      Error::UnregisteredHandler { ref artifact_type, ref version }
        if *artifact_type == ArtifactType::Custom("service_executions".into())
          && version == "2.0.0"
    ));
    assert!(!catalog.record(&p, "2.0.0").unwrap().evicted);
    assert_eq!(catalog.count(ArtifactType::Entities, &p, "2.0.0"), 2);
  }

  #[tokio::test]
  async fn malformed_catalog_version_stops_eviction() {
    let catalog = Arc::new(MemoryCatalog::default());
    let p = project();
    catalog.add_project(&p, &["1.0.0", "nightly", "1.1.0"]);

    let err = service(&catalog).evict_oldest_versions(&p, 1).await.unwrap_err();

    assert!(matches!(err, Error::MalformedVersion(ref v) if v == "nightly"));
    assert!(!catalog.record(&p, "1.0.0").unwrap().evicted);
  }

  #[tokio::test]
  async fn unknown_project_yields_empty_outcomes() {
    let catalog = seeded();
    let ghost = ProjectCoordinates::new("examples.metadata", "ghost");
    let purge = service(&catalog);

    assert!(purge.evict_oldest_versions(&ghost, 0).await.unwrap().is_empty());
    let version = VersionId::Release(ReleaseVersion::new(1, 0, 0));
    assert!(purge.delete_version(&ghost, &version).await.unwrap().is_empty());
  }

  // ─── Deletion ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_version_removes_documents_and_record() {
    let catalog = seeded();
    let p = project();
    let purge = service(&catalog);
    let version: VersionId = "2.0.0".parse().unwrap();

    let outcome = purge.delete_version(&p, &version).await.unwrap();

    assert_eq!(outcome.deleted(&ArtifactType::Entities), 2);
    assert_eq!(outcome.deleted(&ArtifactType::FileGenerations), 1);
    assert_eq!(outcome.deleted_versions, [ProjectVersion::new(&p, "2.0.0")]);
    assert_eq!(catalog.listed(&p), ["2.2.0", "2.3.0"]);
    assert_eq!(catalog.count(ArtifactType::Entities, &p, "2.2.0"), 2);
    assert_eq!(catalog.count(ArtifactType::FileGenerations, &p, "2.3.0"), 1);

    let again = purge.delete_version(&p, &version).await.unwrap();
    assert_eq!(again.total_deleted(), 0);
    assert!(again.deleted_versions.is_empty());
    assert!(!again.has_failures());
  }

  #[tokio::test]
  async fn delete_snapshot_removes_documents_only() {
    let catalog = seeded();
    let p = project();

    let outcome = service(&catalog).delete_version(&p, &VersionId::Snapshot).await.unwrap();

    assert_eq!(outcome.deleted(&ArtifactType::Entities), 1);
    assert!(outcome.deleted_versions.is_empty());
    assert_eq!(catalog.count(ArtifactType::Entities, &p, SNAPSHOT), 0);
    assert_eq!(catalog.listed(&p).len(), 3);
  }

  #[tokio::test]
  async fn failed_delete_keeps_the_record() {
    let catalog = seeded();
    let p = project();
    let handlers = HandlerRegistry::new()
      .with_handler(handler(&catalog, ArtifactType::Entities, true))
      .with_handler(handler(&catalog, ArtifactType::FileGenerations, false));
    let purge = PurgeService::new(catalog.clone(), handlers);

    let outcome = purge.delete_version(&p, &"2.2.0".parse().unwrap()).await.unwrap();

    assert!(outcome.has_failures());
    assert!(outcome.deleted_versions.is_empty());
    assert!(catalog.record(&p, "2.2.0").is_some());
  }

  // ─── Reconciliation ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn reconciliation_deletes_only_versions_missing_upstream() {
    let catalog = seeded();
    let p = project();

    let mut mismatch = VersionMismatch::new("PROD-A", &p.group_id, &p.artifact_id);
    mismatch.versions_not_in_repository = vec!["2.0.0".into()];
    mismatch.versions_not_in_store = vec!["2.4.0".into()];
    mismatch.conflicting_versions = vec!["2.2.0".into()];

    let outcome = service(&catalog)
      .delete_versions_not_in_repository(&[mismatch])
      .await
      .unwrap();

    assert_eq!(catalog.listed(&p), ["2.2.0", "2.3.0"]);
    assert_eq!(catalog.count(ArtifactType::Entities, &p, "2.0.0"), 0);
    assert_eq!(catalog.count(ArtifactType::Entities, &p, "2.2.0"), 2);
    assert!(!catalog.record(&p, "2.2.0").unwrap().evicted);

    assert_eq!(outcome.deleted_versions, [ProjectVersion::new(&p, "2.0.0")]);
    assert_eq!(outcome.unresolved.len(), 1);
    assert_eq!(outcome.unresolved[0].not_in_store, ["2.4.0"]);
    assert_eq!(outcome.unresolved[0].conflicting, ["2.2.0"]);
  }

  #[tokio::test]
  async fn reconciliation_validates_every_report_first() {
    let catalog = seeded();
    let p = project();

    let mut good = VersionMismatch::new("PROD-A", &p.group_id, &p.artifact_id);
    good.versions_not_in_repository = vec!["2.0.0".into()];
    let mut bad = VersionMismatch::new("PROD-A", &p.group_id, &p.artifact_id);
    bad.versions_not_in_repository = vec!["2.x".into()];

    let err = service(&catalog)
      .delete_versions_not_in_repository(&[good, bad])
      .await
      .unwrap_err();

    assert!(matches!(err, Error::MalformedVersion(_)));
    assert_eq!(catalog.listed(&p).len(), 3);
  }

  #[tokio::test]
  async fn reconciliation_never_deletes_the_snapshot_branch() {
    let catalog = seeded();
    let p = project();

    let mut mismatch = VersionMismatch::new("PROD-A", &p.group_id, &p.artifact_id);
    mismatch.versions_not_in_repository = vec![SNAPSHOT.into()];

    let outcome = service(&catalog)
      .delete_versions_not_in_repository(&[mismatch])
      .await
      .unwrap();

    assert_eq!(outcome.total_deleted(), 0);
    assert!(outcome.deleted_versions.is_empty());
    assert_eq!(outcome.unresolved.len(), 1);
    assert_eq!(outcome.unresolved[0].retained, [SNAPSHOT]);
    assert!(outcome.unresolved[0].not_in_store.is_empty());
    assert_eq!(catalog.count(ArtifactType::Entities, &p, SNAPSHOT), 1);
  }

  #[tokio::test]
  async fn reconciliation_reports_catalog_failure_and_keeps_earlier_work() {
    let catalog = Arc::new(MemoryCatalog::default());
    let a = ProjectCoordinates::new("g", "a");
    let b = ProjectCoordinates::new("g", "b");
    for p in [&a, &b] {
      catalog.add_project(p, &["1.0.0"]);
      catalog.put_documents(ArtifactType::Entities, p, "1.0.0", 2);
    }
    catalog.fail_updates(&b);

    let reports: Vec<_> = [&a, &b]
      .into_iter()
      .map(|p| {
        let mut m = VersionMismatch::new("PROD", &p.group_id, &p.artifact_id);
        m.versions_not_in_repository = vec!["1.0.0".into()];
        m
      })
      .collect();

    let outcome = service(&catalog).delete_versions_not_in_repository(&reports).await.unwrap();

    assert_eq!(outcome.deleted_versions, [ProjectVersion::new(&a, "1.0.0")]);
    assert!(catalog.listed(&a).is_empty());
    assert_eq!(outcome.deleted(&ArtifactType::Entities), 4);

    assert!(outcome.has_failures());
    assert_eq!(outcome.catalog_failures.len(), 1);
    assert_eq!(outcome.catalog_failures[0].target, ProjectVersion::new(&b, "1.0.0"));
    assert_eq!(outcome.catalog_failures[0].message, "catalog unavailable");
    assert_eq!(catalog.listed(&b), ["1.0.0"]);
  }

  #[tokio::test]
  async fn eviction_reports_catalog_failure_per_version() {
    let catalog = seeded();
    let p = project();
    catalog.fail_updates(&p);

    let outcome = service(&catalog).evict_oldest_versions(&p, 1).await.unwrap();

    assert!(outcome.evicted.is_empty());
    let targets: Vec<_> =
      outcome.catalog_failures.iter().map(|f| f.target.version_id.as_str()).collect();
    assert_eq!(targets, ["2.0.0", "2.2.0"]);
    assert_eq!(outcome.deleted(&ArtifactType::Entities), 4);
    assert!(!catalog.record(&p, "2.0.0").unwrap().evicted);
    assert!(!catalog.record(&p, "2.2.0").unwrap().evicted);
  }

  #[tokio::test]
  async fn delete_version_reports_catalog_failure() {
    let catalog = seeded();
    let p = project();
    catalog.fail_updates(&p);

    let outcome = service(&catalog).delete_version(&p, &"2.0.0".parse().unwrap()).await.unwrap();

    assert_eq!(outcome.deleted(&ArtifactType::Entities), 2);
    assert!(outcome.deleted_versions.is_empty());
    assert_eq!(outcome.catalog_failures[0].target, ProjectVersion::new(&p, "2.0.0"));
    assert_eq!(catalog.listed(&p).len(), 3);
  }
}
