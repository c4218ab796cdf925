// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rusqlite::Connection;

fn fresh() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    conn
}

#[test]
fn migrate_from_empty_applies_all() {
    let mut conn = fresh();
    let applied = migrate(&mut conn, None, None, 0).unwrap();
    assert_eq!(applied, MIGRATIONS.len());

    let version: u32 =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0)).unwrap();
    assert_eq!(version, latest_version());
}

#[test]
fn migrate_is_idempotent() {
    let mut conn = fresh();
    migrate(&mut conn, None, None, 0).unwrap();
    let applied = migrate(&mut conn, None, None, 1).unwrap();
    assert_eq!(applied, 0, "second run must be a no-op");
}

#[test]
fn migrate_refuses_newer_schema() {
    let mut conn = fresh();
    migrate(&mut conn, None, None, 0).unwrap();
    conn.execute("INSERT INTO schema_version (version, applied_at_ms) VALUES (999, 0)", [])
        .unwrap();
    let err = migrate(&mut conn, None, None, 0).unwrap_err();
    assert!(matches!(err, StorageError::SchemaTooNew { found: 999, .. }));
}

#[test]
fn migrate_writes_file_backup() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("delegate.db");
    let backups = dir.path().join("backups");

    // Seed a DB at v1 only, then re-open so pending migrations exist.
    {
        let mut conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at_ms INTEGER NOT NULL);",
        )
        .unwrap();
        let tx = conn.transaction().unwrap();
        tx.execute_batch(MIGRATIONS[0].sql).unwrap();
        tx.execute("INSERT INTO schema_version VALUES (1, 0)", []).unwrap();
        tx.commit().unwrap();
    }

    let mut conn = Connection::open(&db_path).unwrap();
    let applied = migrate(&mut conn, Some(&db_path), Some(&backups), 1_700_000_000_000).unwrap();
    assert!(applied >= 1);
    let backup_count = std::fs::read_dir(&backups).unwrap().count();
    assert_eq!(backup_count, 1);
}

#[test]
fn no_backup_when_nothing_pending() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("delegate.db");
    let backups = dir.path().join("backups");

    let mut conn = Connection::open(&db_path).unwrap();
    migrate(&mut conn, Some(&db_path), Some(&backups), 0).unwrap();
    let first = std::fs::read_dir(&backups).map(|d| d.count()).unwrap_or(0);

    // Restart: no pending migrations, no new backup.
    drop(conn);
    let mut conn = Connection::open(&db_path).unwrap();
    migrate(&mut conn, Some(&db_path), Some(&backups), 1).unwrap();
    let second = std::fs::read_dir(&backups).map(|d| d.count()).unwrap_or(0);
    assert_eq!(first, second);
}

#[test]
fn health_check_catches_missing_table() {
    let mut conn = fresh();
    migrate(&mut conn, None, None, 0).unwrap();
    conn.execute_batch("DROP TABLE reviews;").unwrap();
    let err = migrate(&mut conn, None, None, 0).unwrap_err();
    assert!(matches!(err, StorageError::HealthCheck(_)));
}
