//! [`SqliteStore`]: the SQLite implementation of [`VersionCatalog`], plus
//! the document collections its artifact handlers operate on.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use stow_core::{
  catalog::VersionCatalog,
  document::{DocumentCounts, EntityDocument, FileGeneration},
  handler::ArtifactType,
  project::{ProjectCoordinates, StoreProject, VersionRecord},
  version::{ReleaseVersion, SNAPSHOT, VersionId, releases_oldest_first},
};

use crate::{
  encode::{
    RawEntity, RawFileGeneration, RawProject, RawVersionRecord, encode_dt,
    encode_project, encode_scope,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A catalog and its document collections backed by a single SQLite file.
///
/// Cloning shares the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn require_project(&self, project: &ProjectCoordinates) -> Result<()> {
    if self.get_project(project).await?.is_none() {
      return Err(Error::ProjectNotFound(project.clone()));
    }
    Ok(())
  }

  // ── Projects and versions ─────────────────────────────────────────────────

  /// Insert a project, or update its project id and default branch if the
  /// coordinates are already known.
  pub async fn upsert_project(&self, project: &StoreProject) -> Result<()> {
    let (group_id, artifact_id) = encode_project(&project.coordinates);
    let project_id     = project.project_id.clone();
    let default_branch = project.default_branch.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (group_id, artifact_id, project_id, default_branch)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (group_id, artifact_id) DO UPDATE SET
             project_id     = excluded.project_id,
             default_branch = excluded.default_branch",
          rusqlite::params![group_id, artifact_id, project_id, default_branch],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Record a release for a known project. Returns `false` if it was already
  /// recorded, in which case its evicted state is left as is.
  pub async fn add_version(
    &self,
    project: &ProjectCoordinates,
    version: &ReleaseVersion,
  ) -> Result<bool> {
    self.require_project(project).await?;
    let (group_id, artifact_id) = encode_project(project);
    let version_id = version.to_string();

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO project_versions (group_id, artifact_id, version_id)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![group_id, artifact_id, version_id],
        )?)
      })
      .await?;
    Ok(inserted > 0)
  }

  // ── Entities ──────────────────────────────────────────────────────────────

  /// Store an entity, replacing any entity with the same path in the same
  /// scope.
  pub async fn insert_entity(&self, entity: &EntityDocument) -> Result<()> {
    self.require_project(&entity.coordinates).await?;
    let (group_id, artifact_id, version_id) =
      encode_scope(&entity.coordinates, &entity.version_id);
    let entity_path     = entity.entity_path.clone();
    let classifier_path = entity.classifier_path.clone();
    let content_json    = entity.content.to_string();
    let versioned       = entity.versioned;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO entities (
             group_id, artifact_id, version_id, entity_path,
             classifier_path, content_json, versioned
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            group_id,
            artifact_id,
            version_id,
            entity_path,
            classifier_path,
            content_json,
            versioned,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Entities of one scope, ordered by path.
  pub async fn get_entities(
    &self,
    project:   &ProjectCoordinates,
    version:   &VersionId,
    versioned: bool,
  ) -> Result<Vec<EntityDocument>> {
    let (group_id, artifact_id, version_id) = encode_scope(project, version);

    let raws: Vec<RawEntity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT group_id, artifact_id, version_id, entity_path,
                  classifier_path, content_json, versioned
           FROM entities
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3
             AND versioned = ?4
           ORDER BY entity_path",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![group_id, artifact_id, version_id, versioned],
            RawEntity::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntity::into_entity).collect()
  }

  pub async fn count_entities(
    &self,
    project:   &ProjectCoordinates,
    version:   &VersionId,
    versioned: bool,
  ) -> Result<u64> {
    let (group_id, artifact_id, version_id) = encode_scope(project, version);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM entities
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3
             AND versioned = ?4",
          rusqlite::params![group_id, artifact_id, version_id, versioned],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  /// Delete every entity of one scope; returns how many were removed.
  pub async fn delete_entities(
    &self,
    project:   &ProjectCoordinates,
    version:   &VersionId,
    versioned: bool,
  ) -> Result<u64> {
    let (group_id, artifact_id, version_id) = encode_scope(project, version);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM entities
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3
             AND versioned = ?4",
          rusqlite::params![group_id, artifact_id, version_id, versioned],
        )?)
      })
      .await?;
    tracing::debug!(%project, %version, versioned, deleted, "deleted entities");
    Ok(deleted as u64)
  }

  /// Entity counts split into release and snapshot-branch documents, for one
  /// project or (with `None`) the whole store.
  pub async fn entity_counts(
    &self,
    project: Option<&ProjectCoordinates>,
  ) -> Result<DocumentCounts> {
    let (group_id, artifact_id) = project.map(encode_project).unzip();

    let (version_documents, revision_documents): (i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(version_id != ?3), 0),
                  COALESCE(SUM(version_id  = ?3), 0)
           FROM entities
           WHERE (?1 IS NULL OR group_id = ?1)
             AND (?2 IS NULL OR artifact_id = ?2)",
          rusqlite::params![group_id, artifact_id, SNAPSHOT],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?)
      })
      .await?;

    Ok(DocumentCounts {
      version_documents:  version_documents as u64,
      revision_documents: revision_documents as u64,
    })
  }

  // ── File generations ──────────────────────────────────────────────────────

  /// Store a generated file, replacing any file with the same path in the
  /// same scope.
  pub async fn insert_file_generation(&self, generation: &FileGeneration) -> Result<()> {
    self.require_project(&generation.coordinates).await?;
    let (group_id, artifact_id, version_id) =
      encode_scope(&generation.coordinates, &generation.version_id);
    let path            = generation.path.clone();
    let generation_type = generation.generation_type.clone();
    let content         = generation.content.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO file_generations (
             group_id, artifact_id, version_id, path, generation_type, content
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            group_id,
            artifact_id,
            version_id,
            path,
            generation_type,
            content,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Generated files of one scope, ordered by path.
  pub async fn get_file_generations(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<Vec<FileGeneration>> {
    let (group_id, artifact_id, version_id) = encode_scope(project, version);

    let raws: Vec<RawFileGeneration> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT group_id, artifact_id, version_id, path, generation_type, content
           FROM file_generations
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3
           ORDER BY path",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![group_id, artifact_id, version_id],
            RawFileGeneration::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFileGeneration::into_file_generation).collect()
  }

  pub async fn count_file_generations(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<u64> {
    let (group_id, artifact_id, version_id) = encode_scope(project, version);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM file_generations
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3",
          rusqlite::params![group_id, artifact_id, version_id],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  /// Total number of generated files across every project.
  pub async fn total_file_generations(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM file_generations", [], |r| r.get(0))?)
      })
      .await?;
    Ok(count as u64)
  }

  /// Delete every generated file of one scope; returns how many were removed.
  pub async fn delete_file_generations(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<u64> {
    let (group_id, artifact_id, version_id) = encode_scope(project, version);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM file_generations
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3",
          rusqlite::params![group_id, artifact_id, version_id],
        )?)
      })
      .await?;
    tracing::debug!(%project, %version, deleted, "deleted file generations");
    Ok(deleted as u64)
  }
}

// ─── VersionCatalog impl ─────────────────────────────────────────────────────

impl VersionCatalog for SqliteStore {
  type Error = Error;

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn list_projects(&self) -> Result<Vec<StoreProject>> {
    let raws: Vec<RawProject> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT group_id, artifact_id, project_id, default_branch
           FROM projects
           ORDER BY group_id, artifact_id",
        )?;
        let rows = stmt
          .query_map([], RawProject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawProject::into_project).collect())
  }

  async fn get_project(&self, project: &ProjectCoordinates) -> Result<Option<StoreProject>> {
    let (group_id, artifact_id) = encode_project(project);

    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT group_id, artifact_id, project_id, default_branch
             FROM projects
             WHERE group_id = ?1 AND artifact_id = ?2",
            rusqlite::params![group_id, artifact_id],
            RawProject::from_row,
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(RawProject::into_project))
  }

  // ── Versions ──────────────────────────────────────────────────────────────

  async fn list_versions(&self, project: &ProjectCoordinates) -> Result<Vec<VersionRecord>> {
    let (group_id, artifact_id) = encode_project(project);

    let raws: Vec<RawVersionRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT version_id, evicted, evicted_at
           FROM project_versions
           WHERE group_id = ?1 AND artifact_id = ?2
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![group_id, artifact_id],
            RawVersionRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut records = raws
      .into_iter()
      .map(RawVersionRecord::into_record)
      .collect::<Result<Vec<_>>>()?;
    VersionRecord::sort_oldest_first(&mut records);
    Ok(records)
  }

  async fn find_version(
    &self,
    project: &ProjectCoordinates,
    version: &ReleaseVersion,
  ) -> Result<Option<VersionRecord>> {
    let (group_id, artifact_id) = encode_project(project);
    let version_id = version.to_string();

    let raw: Option<RawVersionRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT version_id, evicted, evicted_at
             FROM project_versions
             WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3",
            rusqlite::params![group_id, artifact_id, version_id],
            RawVersionRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawVersionRecord::into_record).transpose()
  }

  async fn latest_version(
    &self,
    project: &ProjectCoordinates,
  ) -> Result<Option<ReleaseVersion>> {
    let records = self.list_versions(project).await?;
    let releases = releases_oldest_first(records.iter().map(|r| &r.version_id))?;
    Ok(releases.last().copied())
  }

  async fn mark_evicted(
    &self,
    project: &ProjectCoordinates,
    version: &ReleaseVersion,
  ) -> Result<bool> {
    let (group_id, artifact_id) = encode_project(project);
    let version_id = version.to_string();
    let now        = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE project_versions
           SET evicted = 1, evicted_at = COALESCE(evicted_at, ?4)
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3",
          rusqlite::params![group_id, artifact_id, version_id, now],
        )?)
      })
      .await?;
    Ok(updated > 0)
  }

  async fn remove_version(
    &self,
    project: &ProjectCoordinates,
    version: &ReleaseVersion,
  ) -> Result<bool> {
    let (group_id, artifact_id) = encode_project(project);
    let version_id = version.to_string();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM project_versions
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3",
          rusqlite::params![group_id, artifact_id, version_id],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn document_types(
    &self,
    project: &ProjectCoordinates,
    version: &VersionId,
  ) -> Result<Vec<ArtifactType>> {
    let (group_id, artifact_id, version_id) = encode_scope(project, version);

    let (entity_flags, has_generations): (Vec<bool>, bool) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT versioned FROM entities
           WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3
           ORDER BY versioned",
        )?;
        let flags = stmt
          .query_map(rusqlite::params![group_id, artifact_id, version_id], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<bool>>>()?;

        let has_generations: bool = conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM file_generations
             WHERE group_id = ?1 AND artifact_id = ?2 AND version_id = ?3
           )",
          rusqlite::params![group_id, artifact_id, version_id],
          |r| r.get(0),
        )?;

        Ok((flags, has_generations))
      })
      .await?;

    let mut types: Vec<ArtifactType> = entity_flags
      .into_iter()
      .map(|versioned| {
        if versioned { ArtifactType::VersionedEntities } else { ArtifactType::Entities }
      })
      .collect();
    if has_generations {
      types.push(ArtifactType::FileGenerations);
    }
    Ok(types)
  }
}
