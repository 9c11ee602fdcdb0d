//! stow housekeeper binary.
//!
//! Reads `housekeeper.toml` (or the path given with `--config`) layered with
//! `STOW_*` environment variables, opens the SQLite store, and runs one purge
//! operation or a recurring eviction schedule.
//!
//! ```
//! housekeeper evict --group examples.metadata --artifact test --keep 1
//! housekeeper reconcile --mismatches drift.json
//! housekeeper schedule
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use stow_core::{
  mismatch::VersionMismatch,
  project::ProjectCoordinates,
  purge::PurgeService,
  version::VersionId,
};
use stow_housekeeper::{Housekeeper, HousekeeperConfig, build_registry};
use stow_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Retention and reconciliation for the stow artifact store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "housekeeper.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Evict all but the newest releases of one project.
  Evict {
    #[arg(short, long)]
    group:    String,
    #[arg(short, long)]
    artifact: String,
    /// Releases to retain (default: `keep_versions` from the config).
    #[arg(short, long)]
    keep:     Option<usize>,
  },
  /// Evict all but the newest releases of every project.
  EvictAll {
    #[arg(short, long)]
    keep: Option<usize>,
  },
  /// Delete one version and all of its documents.
  DeleteVersion {
    #[arg(short, long)]
    group:    String,
    #[arg(short, long)]
    artifact: String,
    /// Release (`MAJOR.MINOR.PATCH`) or the snapshot branch.
    #[arg(short, long)]
    version:  VersionId,
  },
  /// Delete versions a reconciliation report found missing upstream.
  Reconcile {
    /// JSON array of version mismatch reports.
    #[arg(short, long, value_name = "FILE")]
    mismatches: PathBuf,
  },
  /// Run `evict-all` every `interval_secs` until interrupted.
  Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("STOW"))
    .build()
    .context("failed to read config file")?;

  let cfg: HousekeeperConfig = settings
    .try_deserialize()
    .context("failed to deserialise HousekeeperConfig")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let registry = build_registry(&store, &cfg.artifact_types)
    .context("failed to register artifact handlers")?;
  let housekeeper = Housekeeper::new(PurgeService::new(Arc::new(store), registry));

  match cli.command {
    Command::Evict { group, artifact, keep } => {
      let project = ProjectCoordinates::new(group, artifact);
      let outcome = housekeeper
        .evict(&project, keep.unwrap_or(cfg.keep_versions))
        .await
        .with_context(|| format!("eviction of {project} failed"))?;
      print_json(&outcome)?;
    }
    Command::EvictAll { keep } => {
      let outcome = housekeeper
        .evict_all(keep.unwrap_or(cfg.keep_versions))
        .await
        .context("eviction pass failed")?;
      print_json(&outcome)?;
    }
    Command::DeleteVersion { group, artifact, version } => {
      let project = ProjectCoordinates::new(group, artifact);
      let outcome = housekeeper
        .delete_version(&project, &version)
        .await
        .with_context(|| format!("deletion of {project} {version} failed"))?;
      print_json(&outcome)?;
    }
    Command::Reconcile { mismatches } => {
      let raw = tokio::fs::read_to_string(&mismatches)
        .await
        .with_context(|| format!("reading {}", mismatches.display()))?;
      let reports: Vec<VersionMismatch> =
        serde_json::from_str(&raw).context("parsing mismatch reports")?;
      let outcome = housekeeper
        .reconcile(&reports)
        .await
        .context("reconciliation failed")?;
      print_json(&outcome)?;
    }
    Command::Schedule => schedule(&housekeeper, &cfg).await?,
  }

  Ok(())
}

async fn schedule(
  housekeeper: &Housekeeper<SqliteStore>,
  cfg: &HousekeeperConfig,
) -> anyhow::Result<()> {
  anyhow::ensure!(cfg.interval_secs > 0, "interval_secs must be positive");

  let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs));
  tracing::info!(
    interval_secs = cfg.interval_secs,
    keep = cfg.keep_versions,
    "scheduled eviction started"
  );

  loop {
    tokio::select! {
      _ = ticker.tick() => {
        match housekeeper.evict_all(cfg.keep_versions).await {
          Ok(outcome) => print_json(&outcome)?,
          Err(e) => tracing::error!(error = %e, "scheduled eviction failed"),
        }
      }
      _ = tokio::signal::ctrl_c() => {
        tracing::info!("interrupted, stopping schedule");
        return Ok(());
      }
    }
  }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
