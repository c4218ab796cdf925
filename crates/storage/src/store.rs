// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store: one connection, a narrow transactional surface.

use crate::error::StorageError;
use crate::migrations;
use dg_core::{Event, EventEnvelope, TeamId};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// Handle to the embedded database.
///
/// A single connection behind a mutex: SQLite serializes writers anyway and
/// the daemon's write paths are short. Readers that need consistency with a
/// write join the same transaction via [`Store::with_tx`].
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if absent) and migrate the database file.
    pub fn open(db_path: &Path, backup_dir: &Path, now_ms: u64) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(db_path)?;
        configure(&conn)?;
        let applied =
            migrations::migrate(&mut conn, Some(db_path), Some(backup_dir), now_ms)?;
        if applied > 0 {
            tracing::info!(applied, "database migrated");
        }
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let mut conn = Connection::open_in_memory()?;
        configure(&conn)?;
        migrations::migrate(&mut conn, None, None, 0)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Run `f` inside a transaction.
    ///
    /// Events emitted through the [`TxCtx`] are appended to the event log in
    /// the same transaction; the assigned envelopes are returned so the
    /// caller can fan them out *after* commit.
    pub fn with_tx<T>(
        &self,
        now_ms: u64,
        f: impl FnOnce(&mut TxCtx<'_>) -> Result<T, StorageError>,
    ) -> Result<(T, Vec<EventEnvelope>), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut ctx = TxCtx { tx: &tx, now_ms, emitted: Vec::new() };
        let value = f(&mut ctx)?;
        let emitted = ctx.emitted;
        tx.commit()?;
        Ok((value, emitted))
    }

    /// Run a read-only closure against the connection.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

fn configure(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Transaction context handed to [`Store::with_tx`] closures.
///
/// Carries the transaction, the wall-clock stamp for this write, and the
/// events appended so far.
pub struct TxCtx<'a> {
    pub(crate) tx: &'a rusqlite::Transaction<'a>,
    pub(crate) now_ms: u64,
    emitted: Vec<EventEnvelope>,
}

impl TxCtx<'_> {
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn conn(&self) -> &rusqlite::Connection {
        self.tx
    }

    /// Append an event to the team log inside this transaction.
    ///
    /// Sequence numbers are assigned here: `team_seq` is the team's previous
    /// maximum plus one, `global_seq` is the events rowid.
    pub fn emit(&mut self, team: TeamId, event: Event) -> Result<EventEnvelope, StorageError> {
        let envelope = crate::events::append(self.tx, team, event, self.now_ms)?;
        self.emitted.push(envelope.clone());
        Ok(envelope)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
