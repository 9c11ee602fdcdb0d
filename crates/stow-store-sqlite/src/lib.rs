//! SQLite backend for the stow artifact metadata store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. [`SqliteStore`] is the version catalog;
//! the [`handlers`] expose its document tables to the purge service.

mod encode;
mod schema;
mod store;

pub mod error;
pub mod handlers;

pub use error::{Error, Result};
pub use handlers::{EntitiesHandler, FileGenerationsHandler, default_registry, handler_for};
pub use store::SqliteStore;
