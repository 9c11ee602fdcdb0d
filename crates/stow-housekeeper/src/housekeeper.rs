//! [`Housekeeper`]: claim-guarded purge passes.

use std::collections::BTreeMap;

use stow_core::{
  catalog::VersionCatalog,
  mismatch::VersionMismatch,
  outcome::{ProjectFailure, PurgeOutcome},
  project::ProjectCoordinates,
  purge::PurgeService,
  version::VersionId,
};
use tracing::Instrument as _;
use uuid::Uuid;

use crate::{ClaimGuard, Error, ProjectClaims, Result};

/// Drives a [`PurgeService`], holding a claim on every project it touches.
///
/// A project already claimed by another pass is skipped with a warning and
/// listed in [`PurgeOutcome::skipped`].
pub struct Housekeeper<C> {
  purge:  PurgeService<C>,
  claims: ProjectClaims,
}

impl<C: VersionCatalog> Housekeeper<C> {
  pub fn new(purge: PurgeService<C>) -> Self { Self::with_claims(purge, ProjectClaims::new()) }

  /// Share `claims` with other housekeepers over the same store.
  pub fn with_claims(purge: PurgeService<C>, claims: ProjectClaims) -> Self {
    Self { purge, claims }
  }

  pub fn purge(&self) -> &PurgeService<C> { &self.purge }

  pub fn claims(&self) -> &ProjectClaims { &self.claims }

  /// Evict all but the `keep` newest releases of one project.
  pub async fn evict(&self, project: &ProjectCoordinates, keep: usize) -> Result<PurgeOutcome> {
    let Some(_claim) = self.claim(project) else {
      return Ok(PurgeOutcome::skipped(project));
    };
    Ok(self.purge.evict_oldest_versions(project, keep).await?)
  }

  /// Evict all but the `keep` newest releases of every project in the
  /// catalog.
  ///
  /// A project whose eviction fails is recorded in
  /// [`PurgeOutcome::project_failures`]; the pass carries on with the rest.
  pub async fn evict_all(&self, keep: usize) -> Result<PurgeOutcome> {
    let run_id = Uuid::new_v4();
    async move {
      let projects = self
        .purge
        .catalog()
        .list_projects()
        .await
        .map_err(stow_core::Error::catalog)?;
      tracing::info!(projects = projects.len(), "starting eviction pass");

      let mut outcome = PurgeOutcome::new();
      for project in &projects {
        match self.evict(&project.coordinates, keep).await {
          Ok(evicted) => outcome.merge(evicted),
          Err(e) => {
            tracing::error!(project = %project.coordinates, error = %e, "eviction failed");
            outcome.project_failures.push(ProjectFailure {
              coordinates: project.coordinates.clone(),
              message:     e.to_string(),
            });
          }
        }
      }

      tracing::info!(
        evicted = outcome.evicted.len(),
        documents = outcome.total_deleted(),
        failed = outcome.has_failures(),
        skipped = outcome.skipped.len(),
        "eviction pass finished"
      );
      Ok::<_, Error>(outcome)
    }
    .instrument(tracing::info_span!("evict_all", %run_id, keep))
    .await
  }

  /// Hard-delete one version of one project.
  pub async fn delete_version(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<PurgeOutcome> {
    let Some(_claim) = self.claim(project) else {
      return Ok(PurgeOutcome::skipped(project));
    };
    Ok(self.purge.delete_version(project, version).await?)
  }

  /// Apply reconciliation reports, skipping projects another pass holds.
  /// Every report that is not skipped is handed to the purge service in one
  /// call, so the whole batch is validated before anything is deleted.
  pub async fn reconcile(&self, mismatches: &[VersionMismatch]) -> Result<PurgeOutcome> {
    let run_id = Uuid::new_v4();
    async move {
      let mut held: BTreeMap<ProjectCoordinates, ClaimGuard> = BTreeMap::new();
      let mut claimed = Vec::with_capacity(mismatches.len());
      let mut outcome = PurgeOutcome::new();

      for mismatch in mismatches {
        let project = mismatch.coordinates();
        if outcome.skipped.contains(&project) {
          continue;
        }
        if !held.contains_key(&project) {
          let Some(guard) = self.claim(&project) else {
            outcome.skipped.push(project);
            continue;
          };
          held.insert(project, guard);
        }
        claimed.push(mismatch.clone());
      }

      tracing::info!(
        reports = mismatches.len(),
        claimed = claimed.len(),
        "starting reconciliation"
      );
      outcome.merge(self.purge.delete_versions_not_in_repository(&claimed).await?);
      Ok::<_, Error>(outcome)
    }
    .instrument(tracing::info_span!("reconcile", %run_id))
    .await
  }

  fn claim(&self, project: &ProjectCoordinates) -> Option<ClaimGuard> {
    let guard = self.claims.try_claim(project);
    if guard.is_none() {
      tracing::warn!(%project, "project is already being purged, skipping");
    }
    guard
  }
}
