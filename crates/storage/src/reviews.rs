// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Review rows. Immutable once written.

use crate::error::StorageError;
use dg_core::{Review, ReviewComment, ReviewDecision, ReviewId, TaskId};
use rusqlite::{params, Connection};

/// Insert a review record, assigning the next attempt number for the task.
pub fn insert(
    conn: &Connection,
    task: TaskId,
    reviewer: &str,
    summary: &str,
    comments: &[ReviewComment],
    decision: ReviewDecision,
    at_ms: u64,
) -> Result<Review, StorageError> {
    let attempt: u32 = conn.query_row(
        "SELECT COALESCE(MAX(attempt), 0) + 1 FROM reviews WHERE task_id = ?1",
        params![task.0],
        |r| r.get(0),
    )?;
    let decision_str = decision.to_string();
    conn.execute(
        "INSERT INTO reviews (task_id, attempt, reviewer, summary, comments_json, decision, at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            task.0,
            attempt,
            reviewer,
            summary,
            serde_json::to_string(comments).map_err(|e| StorageError::Corrupt(e.to_string()))?,
            decision_str,
            at_ms as i64,
        ],
    )?;
    Ok(Review {
        id: ReviewId(conn.last_insert_rowid()),
        task,
        attempt,
        reviewer: reviewer.to_string(),
        summary: summary.to_string(),
        comments: comments.to_vec(),
        decision,
        at_ms,
    })
}

/// All reviews for a task, oldest attempt first.
pub fn for_task(conn: &Connection, task: TaskId) -> Result<Vec<Review>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, attempt, reviewer, summary, comments_json, decision, at_ms
         FROM reviews WHERE task_id = ?1 ORDER BY attempt",
    )?;
    let rows = stmt.query_map(params![task.0], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, u32>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, i64>(6)?,
        ))
    })?;
    let mut reviews = Vec::new();
    for row in rows {
        let (id, attempt, reviewer, summary, comments_json, decision, at_ms) = row?;
        let decision = ReviewDecision::parse(&decision)
            .ok_or_else(|| StorageError::Corrupt(format!("review decision {decision:?}")))?;
        reviews.push(Review {
            id: ReviewId(id),
            task,
            attempt,
            reviewer,
            summary,
            comments: serde_json::from_str(&comments_json).unwrap_or_default(),
            decision,
            at_ms: at_ms as u64,
        });
    }
    Ok(reviews)
}

/// The most recent review for a task, if any.
pub fn latest(conn: &Connection, task: TaskId) -> Result<Option<Review>, StorageError> {
    Ok(for_task(conn, task)?.pop())
}

#[cfg(test)]
#[path = "reviews_tests.rs"]
mod tests;
