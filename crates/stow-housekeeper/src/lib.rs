//! Scheduling and administration for the stow purge service.
//!
//! [`Housekeeper`] wraps a [`PurgeService`](stow_core::purge::PurgeService)
//! with per-project [`ProjectClaims`], so overlapping passes never purge the
//! same project twice at once.

pub mod claims;
pub mod config;
pub mod error;
pub mod housekeeper;

pub use claims::{ClaimGuard, ProjectClaims};
pub use config::{HousekeeperConfig, build_registry};
pub use error::{Error, Result};
pub use housekeeper::Housekeeper;
