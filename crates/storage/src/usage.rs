// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage rollups per agent and per task.

use crate::error::StorageError;
use dg_core::{TaskId, TeamId, TurnUsage, UsageTotals};
use rusqlite::{params, Connection, OptionalExtension};

/// Fold one turn's usage into the agent rollup (and the task rollup when
/// the turn was working a task).
pub fn record_turn(
    conn: &Connection,
    team: TeamId,
    agent: &str,
    task: Option<TaskId>,
    usage: &TurnUsage,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO usage_totals (team_id, agent, input_tokens, output_tokens, cost_usd, turns)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)
         ON CONFLICT (team_id, agent) DO UPDATE SET
            input_tokens = input_tokens + excluded.input_tokens,
            output_tokens = output_tokens + excluded.output_tokens,
            cost_usd = cost_usd + excluded.cost_usd,
            turns = turns + 1",
        params![
            team.to_string(),
            agent,
            usage.input_tokens as i64,
            usage.output_tokens as i64,
            usage.cost_usd,
        ],
    )?;
    if let Some(task) = task {
        conn.execute(
            "INSERT INTO task_usage (task_id, input_tokens, output_tokens, cost_usd, turns)
             VALUES (?1, ?2, ?3, ?4, 1)
             ON CONFLICT (task_id) DO UPDATE SET
                input_tokens = input_tokens + excluded.input_tokens,
                output_tokens = output_tokens + excluded.output_tokens,
                cost_usd = cost_usd + excluded.cost_usd,
                turns = turns + 1",
            params![task.0, usage.input_tokens as i64, usage.output_tokens as i64, usage.cost_usd],
        )?;
    }
    Ok(())
}

pub fn agent_totals(
    conn: &Connection,
    team: TeamId,
    agent: &str,
) -> Result<UsageTotals, StorageError> {
    Ok(conn
        .query_row(
            "SELECT input_tokens, output_tokens, cost_usd, turns FROM usage_totals
             WHERE team_id = ?1 AND agent = ?2",
            params![team.to_string(), agent],
            row_to_totals,
        )
        .optional()?
        .unwrap_or_default())
}

pub fn task_totals(conn: &Connection, task: TaskId) -> Result<UsageTotals, StorageError> {
    Ok(conn
        .query_row(
            "SELECT input_tokens, output_tokens, cost_usd, turns FROM task_usage
             WHERE task_id = ?1",
            params![task.0],
            row_to_totals,
        )
        .optional()?
        .unwrap_or_default())
}

fn row_to_totals(row: &rusqlite::Row<'_>) -> rusqlite::Result<UsageTotals> {
    Ok(UsageTotals {
        input_tokens: row.get::<_, i64>(0)? as u64,
        output_tokens: row.get::<_, i64>(1)? as u64,
        cost_usd: row.get(2)?,
        turns: row.get::<_, i64>(3)? as u64,
    })
}
