// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Numbered schema migrations.
//!
//! Protocol (run once at daemon startup, before anything else touches the
//! DB): snapshot the file into `backups/`, apply pending migrations in order
//! inside a transaction each, health-check the result. Any failure restores
//! the backup bytes and aborts startup.

use crate::error::StorageError;
use rusqlite::Connection;
use std::path::Path;

pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: r#"
CREATE TABLE teams (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    charter       TEXT NOT NULL DEFAULT '',
    default_model TEXT NOT NULL,
    models_json   TEXT NOT NULL DEFAULT '{}',
    created_at_ms INTEGER NOT NULL
);

CREATE TABLE agents (
    team_id       TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    role          TEXT NOT NULL,
    model         TEXT NOT NULL DEFAULT '',
    created_at_ms INTEGER NOT NULL,
    PRIMARY KEY (team_id, name)
);

CREATE TABLE repos (
    team_id       TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    path          TEXT NOT NULL,
    target_branch TEXT NOT NULL DEFAULT 'main',
    premerge_cmd  TEXT,
    approval      TEXT NOT NULL DEFAULT 'human',
    PRIMARY KEY (team_id, name)
);

CREATE TABLE tasks (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id          TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    title            TEXT NOT NULL,
    description      TEXT NOT NULL DEFAULT '',
    priority         TEXT NOT NULL DEFAULT 'normal',
    status           TEXT NOT NULL,
    assignee         TEXT,
    dri              TEXT,
    reviewer         TEXT,
    branch           TEXT NOT NULL,
    repos_json       TEXT NOT NULL DEFAULT '[]',
    base_shas_json   TEXT NOT NULL DEFAULT '{}',
    attachments_json TEXT NOT NULL DEFAULT '[]',
    approval_status  TEXT NOT NULL DEFAULT 'pending',
    rejection_reason TEXT,
    status_detail    TEXT,
    workflow_name    TEXT NOT NULL,
    workflow_version INTEGER NOT NULL,
    created_at_ms    INTEGER NOT NULL,
    updated_at_ms    INTEGER NOT NULL,
    completed_at_ms  INTEGER
);
CREATE INDEX idx_tasks_team_status ON tasks(team_id, status);

CREATE TABLE task_deps (
    task_id    INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    depends_on INTEGER NOT NULL REFERENCES tasks(id),
    PRIMARY KEY (task_id, depends_on)
);

CREATE TABLE messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id     TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    sender_kind TEXT NOT NULL,
    sender_name TEXT NOT NULL DEFAULT '',
    recipient   TEXT NOT NULL,
    kind        TEXT NOT NULL,
    body        TEXT NOT NULL,
    task_id     INTEGER,
    at_ms       INTEGER NOT NULL,
    read        INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX idx_messages_unread ON messages(team_id, recipient, read, id);

CREATE TABLE reviews (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id       INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    attempt       INTEGER NOT NULL,
    reviewer      TEXT NOT NULL,
    summary       TEXT NOT NULL DEFAULT '',
    comments_json TEXT NOT NULL DEFAULT '[]',
    decision      TEXT NOT NULL,
    at_ms         INTEGER NOT NULL
);
CREATE INDEX idx_reviews_task ON reviews(task_id, attempt);

CREATE TABLE events (
    global_seq INTEGER PRIMARY KEY AUTOINCREMENT,
    team_id    TEXT NOT NULL,
    team_seq   INTEGER NOT NULL,
    kind       TEXT NOT NULL,
    payload    TEXT NOT NULL,
    at_ms      INTEGER NOT NULL
);
CREATE INDEX idx_events_team ON events(team_id, team_seq);

CREATE TABLE usage_totals (
    team_id       TEXT NOT NULL,
    agent         TEXT NOT NULL,
    input_tokens  INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    cost_usd      REAL NOT NULL DEFAULT 0,
    turns         INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (team_id, agent)
);
"#,
    },
    Migration {
        version: 2,
        name: "task_usage_rollup",
        sql: r#"
CREATE TABLE task_usage (
    task_id       INTEGER PRIMARY KEY REFERENCES tasks(id) ON DELETE CASCADE,
    input_tokens  INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    cost_usd      REAL NOT NULL DEFAULT 0,
    turns         INTEGER NOT NULL DEFAULT 0
);
"#,
    },
];

/// Tables the post-migration health check probes.
const EXPECTED_TABLES: &[&str] = &[
    "teams",
    "agents",
    "repos",
    "tasks",
    "task_deps",
    "messages",
    "reviews",
    "events",
    "usage_totals",
    "task_usage",
    "schema_version",
];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Apply all pending migrations. Returns the number applied.
///
/// `db_path`/`backup_dir` are `None` for in-memory databases (tests), which
/// skips the file snapshot but follows the same transactional protocol.
pub fn migrate(
    conn: &mut Connection,
    db_path: Option<&Path>,
    backup_dir: Option<&Path>,
    now_ms: u64,
) -> Result<usize, StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version       INTEGER PRIMARY KEY,
            applied_at_ms INTEGER NOT NULL
        );",
    )?;

    let current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;
    let supported = latest_version();
    if current > supported {
        return Err(StorageError::SchemaTooNew { found: current, supported });
    }

    let pending: Vec<&Migration> =
        MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        health_check(conn)?;
        return Ok(0);
    }

    // Snapshot the file before touching the schema.
    let backup = match (db_path, backup_dir) {
        (Some(db), Some(dir)) if db.exists() => Some(snapshot(db, dir, now_ms)?),
        _ => None,
    };

    let applied = apply_pending(conn, &pending, now_ms);

    match applied.and_then(|n| health_check(conn).map(|_| n)) {
        Ok(n) => {
            prune_backups(backup_dir);
            Ok(n)
        }
        Err(e) => {
            // Restore the snapshot so the next startup sees the old schema.
            if let (Some(db), Some(ref bak)) = (db_path, backup) {
                if let Err(restore_err) = std::fs::copy(bak, db) {
                    tracing::error!(
                        backup = %bak.display(),
                        error = %restore_err,
                        "failed to restore DB backup after migration failure"
                    );
                }
            }
            Err(e)
        }
    }
}

fn apply_pending(conn: &mut Connection, pending: &[&Migration], now_ms: u64) -> Result<usize, StorageError> {
    for m in pending {
        let tx = conn.transaction()?;
        tx.execute_batch(m.sql).map_err(|e| StorageError::MigrationFailed {
            version: m.version,
            detail: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at_ms) VALUES (?1, ?2)",
            rusqlite::params![m.version, now_ms as i64],
        )?;
        tx.commit()?;
        tracing::info!(version = m.version, name = m.name, "applied migration");
    }
    Ok(pending.len())
}

/// Probe every expected table with a trivial query.
fn health_check(conn: &Connection) -> Result<(), StorageError> {
    for table in EXPECTED_TABLES {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get::<_, i64>(0))
            .map_err(|e| StorageError::HealthCheck(format!("{table}: {e}")))?;
    }
    Ok(())
}

fn snapshot(db_path: &Path, backup_dir: &Path, now_ms: u64) -> Result<std::path::PathBuf, StorageError> {
    std::fs::create_dir_all(backup_dir)?;
    let stamp = chrono::DateTime::from_timestamp_millis(now_ms as i64)
        .map(|t| t.format("%Y%m%dT%H%M%S%3fZ").to_string())
        .unwrap_or_else(|| now_ms.to_string());
    let dest = backup_dir.join(format!("{stamp}.db"));
    std::fs::copy(db_path, &dest)?;
    Ok(dest)
}

/// Keep only the 10 most recent backups.
fn prune_backups(backup_dir: Option<&Path>) {
    const KEEP: usize = 10;
    let Some(dir) = backup_dir else { return };
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    let mut backups: Vec<_> = entries
        .flatten()
        .filter(|e| e.path().extension().is_some_and(|x| x == "db"))
        .map(|e| e.path())
        .collect();
    backups.sort();
    if backups.len() > KEEP {
        for old in &backups[..backups.len() - KEEP] {
            let _ = std::fs::remove_file(old);
        }
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
