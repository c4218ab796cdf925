// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message rows: mailboxes and history.

use crate::error::StorageError;
use dg_core::{Message, MessageId, MessageKind, Sender, TaskId, TeamId};
use rusqlite::{params, Connection};

/// Insert a message addressed to `recipient`'s mailbox.
pub fn insert(
    conn: &Connection,
    team: TeamId,
    sender: &Sender,
    recipient: &str,
    kind: MessageKind,
    body: &str,
    task: Option<TaskId>,
    at_ms: u64,
) -> Result<Message, StorageError> {
    let (sender_kind, sender_name) = match sender {
        Sender::Human(n) => ("human", n.as_str()),
        Sender::Agent(n) => ("agent", n.as_str()),
        Sender::Daemon => ("daemon", ""),
    };
    conn.execute(
        "INSERT INTO messages (team_id, sender_kind, sender_name, recipient, kind, body,
                               task_id, at_ms, read)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
        params![
            team.to_string(),
            sender_kind,
            sender_name,
            recipient,
            kind.to_string(),
            body,
            task.map(|t| t.0),
            at_ms as i64,
        ],
    )?;
    Ok(Message {
        id: MessageId(conn.last_insert_rowid()),
        team,
        sender: sender.clone(),
        recipient: recipient.to_string(),
        kind,
        body: body.to_string(),
        task,
        at_ms,
        read: false,
    })
}

/// All unread messages for a team, oldest first, ungrouped;
/// the scheduler does the per-recipient grouping.
pub fn unread(conn: &Connection, team: TeamId) -> Result<Vec<Message>, StorageError> {
    query(
        conn,
        "SELECT * FROM messages WHERE team_id = ?1 AND read = 0 ORDER BY id",
        params![team.to_string()],
    )
}

/// Unread messages for one recipient, oldest first.
pub fn unread_for(
    conn: &Connection,
    team: TeamId,
    recipient: &str,
) -> Result<Vec<Message>, StorageError> {
    query(
        conn,
        "SELECT * FROM messages WHERE team_id = ?1 AND recipient = ?2 AND read = 0 ORDER BY id",
        params![team.to_string(), recipient],
    )
}

/// Message history for a team, newest last, capped at `limit`.
pub fn history(conn: &Connection, team: TeamId, limit: usize) -> Result<Vec<Message>, StorageError> {
    let mut messages = query(
        conn,
        "SELECT * FROM messages WHERE team_id = ?1 ORDER BY id DESC LIMIT ?2",
        params![team.to_string(), limit as i64],
    )?;
    messages.reverse();
    Ok(messages)
}

pub fn mark_read(conn: &Connection, ids: &[MessageId]) -> Result<(), StorageError> {
    for id in ids {
        conn.execute("UPDATE messages SET read = 1 WHERE id = ?1", params![id.0])?;
    }
    Ok(())
}

/// Re-queue messages as unread (rate-limit retry path).
pub fn mark_unread(conn: &Connection, ids: &[MessageId]) -> Result<(), StorageError> {
    for id in ids {
        conn.execute("UPDATE messages SET read = 0 WHERE id = ?1", params![id.0])?;
    }
    Ok(())
}

fn query(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<Message>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, row_to_message)?;
    rows.collect::<Result<_, _>>().map_err(Into::into)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let team: String = row.get("team_id")?;
    let sender_kind: String = row.get("sender_kind")?;
    let sender_name: String = row.get("sender_name")?;
    let sender = match sender_kind.as_str() {
        "human" => Sender::Human(sender_name),
        "agent" => Sender::Agent(sender_name),
        _ => Sender::Daemon,
    };
    Ok(Message {
        id: MessageId(row.get("id")?),
        team: TeamId::parse(&team).unwrap_or_default(),
        sender,
        recipient: row.get("recipient")?,
        kind: MessageKind::parse(&row.get::<_, String>("kind")?).unwrap_or(MessageKind::Chat),
        body: row.get("body")?,
        task: row.get::<_, Option<i64>>("task_id")?.map(TaskId),
        at_ms: row.get::<_, i64>("at_ms")? as u64,
        read: row.get::<_, i64>("read")? != 0,
    })
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
