//! SQL schema for the stow SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS projects (
    group_id       TEXT NOT NULL,
    artifact_id    TEXT NOT NULL,
    project_id     TEXT NOT NULL,
    default_branch TEXT NOT NULL DEFAULT 'master',
    PRIMARY KEY (group_id, artifact_id)
);

-- Release records only; the snapshot branch is never listed here.
CREATE TABLE IF NOT EXISTS project_versions (
    group_id    TEXT NOT NULL,
    artifact_id TEXT NOT NULL,
    version_id  TEXT NOT NULL,
    evicted     INTEGER NOT NULL DEFAULT 0,
    evicted_at  TEXT,                 -- ISO 8601 UTC; set on first eviction
    UNIQUE (group_id, artifact_id, version_id),
    FOREIGN KEY (group_id, artifact_id)
        REFERENCES projects(group_id, artifact_id) ON DELETE CASCADE
);

-- Documents are scoped by version_id, which may be the snapshot token.
-- No foreign key to project_versions: snapshot documents have no record.
CREATE TABLE IF NOT EXISTS entities (
    group_id        TEXT NOT NULL,
    artifact_id     TEXT NOT NULL,
    version_id      TEXT NOT NULL,
    entity_path     TEXT NOT NULL,
    classifier_path TEXT NOT NULL,
    content_json    TEXT NOT NULL,
    versioned       INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (group_id, artifact_id, version_id, versioned, entity_path)
);

CREATE TABLE IF NOT EXISTS file_generations (
    group_id        TEXT NOT NULL,
    artifact_id     TEXT NOT NULL,
    version_id      TEXT NOT NULL,
    path            TEXT NOT NULL,
    generation_type TEXT NOT NULL,
    content         TEXT NOT NULL,
    PRIMARY KEY (group_id, artifact_id, version_id, path)
);

PRAGMA user_version = 1;
";
