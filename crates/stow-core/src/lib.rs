//! Core types and the purge service for the stow artifact metadata store.
//!
//! No storage backend lives here. Backends implement
//! [`catalog::VersionCatalog`] and [`handler::ArtifactHandler`]; schedulers
//! drive [`purge::PurgeService`].

// Catalog traits declare their futures `Send` explicitly; silence the
// advisory lint about native `async fn` in public traits.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod document;
pub mod error;
pub mod handler;
pub mod mismatch;
pub mod outcome;
pub mod project;
pub mod purge;
pub mod version;

pub use error::{Error, Result};
