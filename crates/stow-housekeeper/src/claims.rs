//! In-process claims that keep two purge passes off the same project.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use stow_core::project::ProjectCoordinates;

/// The set of projects currently being purged.
///
/// Cloning shares the underlying set.
#[derive(Clone, Default)]
pub struct ProjectClaims {
  held: Arc<Mutex<HashSet<ProjectCoordinates>>>,
}

impl ProjectClaims {
  pub fn new() -> Self { Self::default() }

  /// Claim `project`, or `None` if someone already holds it. The claim is
  /// released when the guard is dropped.
  pub fn try_claim(&self, project: &ProjectCoordinates) -> Option<ClaimGuard> {
    if !self.lock().insert(project.clone()) {
      return None;
    }
    Some(ClaimGuard { claims: self.clone(), project: project.clone() })
  }

  pub fn is_claimed(&self, project: &ProjectCoordinates) -> bool {
    self.lock().contains(project)
  }

  fn lock(&self) -> MutexGuard<'_, HashSet<ProjectCoordinates>> {
    // The set stays consistent even if a holder panicked mid-pass.
    self.held.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Exclusive hold on one project; see [`ProjectClaims::try_claim`].
pub struct ClaimGuard {
  claims:  ProjectClaims,
  project: ProjectCoordinates,
}

impl ClaimGuard {
  pub fn project(&self) -> &ProjectCoordinates { &self.project }
}

impl Drop for ClaimGuard {
  fn drop(&mut self) { self.claims.lock().remove(&self.project); }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn project(artifact_id: &str) -> ProjectCoordinates {
    ProjectCoordinates::new("examples.metadata", artifact_id)
  }

  #[test]
  fn second_claim_on_same_project_is_refused() {
    let claims = ProjectClaims::new();
    let guard = claims.try_claim(&project("test")).expect("first claim");
    assert_eq!(guard.project(), &project("test"));
    assert!(claims.try_claim(&project("test")).is_none());
    assert!(claims.is_claimed(&project("test")));
  }

  #[test]
  fn dropping_the_guard_releases_the_claim() {
    let claims = ProjectClaims::new();
    drop(claims.try_claim(&project("test")).unwrap());
    assert!(!claims.is_claimed(&project("test")));
    assert!(claims.try_claim(&project("test")).is_some());
  }

  #[test]
  fn different_projects_are_independent() {
    let claims = ProjectClaims::new();
    let _a = claims.try_claim(&project("test")).unwrap();
    let _b = claims.try_claim(&project("test1")).unwrap();
    assert!(claims.clone().is_claimed(&project("test1")));
  }
}
