//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, version identifiers in their
//! display form, and entity content as compact JSON.

use chrono::{DateTime, Utc};
use stow_core::{
  document::{EntityDocument, FileGeneration},
  project::{ProjectCoordinates, StoreProject, VersionRecord},
  version::VersionId,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Owned `(group_id, artifact_id)` columns, ready to move into a query
/// closure.
pub fn encode_project(project: &ProjectCoordinates) -> (String, String) {
  (project.group_id.clone(), project.artifact_id.clone())
}

/// Owned `(group_id, artifact_id, version_id)` columns for a document scope.
pub fn encode_scope(
  project: &ProjectCoordinates,
  version: &VersionId,
) -> (String, String, String) {
  (project.group_id.clone(), project.artifact_id.clone(), version.to_string())
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `projects` row.
pub struct RawProject {
  pub group_id:       String,
  pub artifact_id:    String,
  pub project_id:     String,
  pub default_branch: String,
}

impl RawProject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:       row.get(0)?,
      artifact_id:    row.get(1)?,
      project_id:     row.get(2)?,
      default_branch: row.get(3)?,
    })
  }

  pub fn into_project(self) -> StoreProject {
    StoreProject {
      project_id:     self.project_id,
      coordinates:    ProjectCoordinates::new(self.group_id, self.artifact_id),
      default_branch: self.default_branch,
    }
  }
}

/// Raw values read directly from a `project_versions` row.
pub struct RawVersionRecord {
  pub version_id: String,
  pub evicted:    bool,
  pub evicted_at: Option<String>,
}

impl RawVersionRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id: row.get(0)?,
      evicted:    row.get(1)?,
      evicted_at: row.get(2)?,
    })
  }

  pub fn into_record(self) -> Result<VersionRecord> {
    Ok(VersionRecord {
      version_id: self.version_id,
      evicted:    self.evicted,
      evicted_at: self.evicted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from an `entities` row.
pub struct RawEntity {
  pub group_id:        String,
  pub artifact_id:     String,
  pub version_id:      String,
  pub entity_path:     String,
  pub classifier_path: String,
  pub content_json:    String,
  pub versioned:       bool,
}

impl RawEntity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:        row.get(0)?,
      artifact_id:     row.get(1)?,
      version_id:      row.get(2)?,
      entity_path:     row.get(3)?,
      classifier_path: row.get(4)?,
      content_json:    row.get(5)?,
      versioned:       row.get(6)?,
    })
  }

  pub fn into_entity(self) -> Result<EntityDocument> {
    Ok(EntityDocument {
      coordinates:     ProjectCoordinates::new(self.group_id, self.artifact_id),
      version_id:      self.version_id.parse()?,
      entity_path:     self.entity_path,
      classifier_path: self.classifier_path,
      content:         serde_json::from_str(&self.content_json)?,
      versioned:       self.versioned,
    })
  }
}

/// Raw values read directly from a `file_generations` row.
pub struct RawFileGeneration {
  pub group_id:        String,
  pub artifact_id:     String,
  pub version_id:      String,
  pub path:            String,
  pub generation_type: String,
  pub content:         String,
}

impl RawFileGeneration {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:        row.get(0)?,
      artifact_id:     row.get(1)?,
      version_id:      row.get(2)?,
      path:            row.get(3)?,
      generation_type: row.get(4)?,
      content:         row.get(5)?,
    })
  }

  pub fn into_file_generation(self) -> Result<FileGeneration> {
    Ok(FileGeneration {
      coordinates:     ProjectCoordinates::new(self.group_id, self.artifact_id),
      version_id:      self.version_id.parse()?,
      path:            self.path,
      generation_type: self.generation_type,
      content:         self.content,
    })
  }
}
