// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable event log.
//!
//! Appends happen inside the transaction of the causing write (via
//! [`crate::TxCtx::emit`]); reads serve SSE catch-up.

use crate::error::StorageError;
use dg_core::{Event, EventEnvelope, TeamId};
use rusqlite::{params, Connection};

pub(crate) fn append(
    conn: &Connection,
    team: TeamId,
    event: Event,
    at_ms: u64,
) -> Result<EventEnvelope, StorageError> {
    let team_seq: i64 = conn.query_row(
        "SELECT COALESCE(MAX(team_seq), 0) + 1 FROM events WHERE team_id = ?1",
        params![team.to_string()],
        |r| r.get(0),
    )?;
    let payload = serde_json::to_string(&event)
        .map_err(|e| StorageError::Corrupt(format!("event serialize: {e}")))?;
    conn.execute(
        "INSERT INTO events (team_id, team_seq, kind, payload, at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![team.to_string(), team_seq, event.kind(), payload, at_ms as i64],
    )?;
    let global_seq = conn.last_insert_rowid();
    Ok(EventEnvelope { global_seq, team_seq, team, at_ms, event })
}

/// Events for a team with `team_seq` greater than `after`, oldest first.
pub fn team_events_after(
    conn: &Connection,
    team: TeamId,
    after: i64,
    limit: usize,
) -> Result<Vec<EventEnvelope>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT global_seq, team_seq, payload, at_ms FROM events
         WHERE team_id = ?1 AND team_seq > ?2
         ORDER BY team_seq ASC LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![team.to_string(), after, limit as i64], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, i64>(3)?,
        ))
    })?;
    let mut envelopes = Vec::new();
    for row in rows {
        let (global_seq, team_seq, payload, at_ms) = row?;
        let event: Event = serde_json::from_str(&payload)
            .map_err(|e| StorageError::Corrupt(format!("event {global_seq}: {e}")))?;
        envelopes.push(EventEnvelope { global_seq, team_seq, team, at_ms: at_ms as u64, event });
    }
    Ok(envelopes)
}

/// Latest team sequence number (0 when the team has no events).
pub fn latest_team_seq(conn: &Connection, team: TeamId) -> Result<i64, StorageError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(team_seq), 0) FROM events WHERE team_id = ?1",
        params![team.to_string()],
        |r| r.get(0),
    )?)
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
