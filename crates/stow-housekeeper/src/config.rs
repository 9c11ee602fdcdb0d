//! Runtime configuration for the housekeeper.

use std::path::PathBuf;

use serde::Deserialize;
use stow_core::handler::{ArtifactType, HandlerRegistry};
use stow_store_sqlite::{SqliteStore, handler_for};

use crate::{Error, Result};

/// Housekeeper configuration, deserialised from `housekeeper.toml` and
/// `STOW_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct HousekeeperConfig {
  pub store_path:     PathBuf,
  /// Releases retained per project by scheduled eviction.
  #[serde(default = "default_keep_versions")]
  pub keep_versions:  usize,
  /// Seconds between scheduled passes.
  #[serde(default = "default_interval_secs")]
  pub interval_secs:  u64,
  /// Artifact types to register handlers for.
  #[serde(default = "default_artifact_types")]
  pub artifact_types: Vec<ArtifactType>,
}

fn default_keep_versions() -> usize { 10 }

fn default_interval_secs() -> u64 { 86_400 }

fn default_artifact_types() -> Vec<ArtifactType> { ArtifactType::BUILT_IN.to_vec() }

/// Build a registry holding the store's handler for each of `types`.
///
/// # Errors
///
/// [`Error::UnsupportedArtifactType`] for a type the store has no handler
/// implementation for.
pub fn build_registry(store: &SqliteStore, types: &[ArtifactType]) -> Result<HandlerRegistry> {
  let mut registry = HandlerRegistry::new();
  for artifact_type in types {
    let handler = handler_for(store, artifact_type)
      .ok_or_else(|| Error::UnsupportedArtifactType(artifact_type.clone()))?;
    registry.register(handler);
  }
  Ok(registry)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> HousekeeperConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_apply_when_only_store_path_is_set() {
    let cfg = parse(r#"store_path = "~/stow/store.db""#);
    assert_eq!(cfg.store_path, PathBuf::from("~/stow/store.db"));
    assert_eq!(cfg.keep_versions, 10);
    assert_eq!(cfg.interval_secs, 86_400);
    assert_eq!(cfg.artifact_types, ArtifactType::BUILT_IN);
  }

  #[test]
  fn artifact_types_parse_from_names() {
    let cfg = parse(
      r#"
        store_path     = "store.db"
        keep_versions  = 3
        artifact_types = ["entities", "file_generations"]
      "#,
    );
    assert_eq!(cfg.keep_versions, 3);
    assert_eq!(cfg.artifact_types, [ArtifactType::Entities, ArtifactType::FileGenerations]);
  }

  #[tokio::test]
  async fn registry_covers_configured_types_only() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = build_registry(&store, &[ArtifactType::FileGenerations]).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(&ArtifactType::FileGenerations));
    assert!(!registry.contains(&ArtifactType::Entities));
  }

  #[tokio::test]
  async fn custom_type_without_implementation_is_rejected() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let err = build_registry(&store, &["service_jars".parse().unwrap()]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedArtifactType(ArtifactType::Custom(ref t)) if t == "service_jars"));
  }
}
