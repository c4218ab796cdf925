// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team, agent, and repo rows.

use crate::error::StorageError;
use dg_core::{
    Agent, AgentName, ApprovalPolicy, ErrorCode, RepoConfig, RepoName, Role, Team, TeamId,
    UserError,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;

pub fn insert_team(conn: &Connection, team: &Team) -> Result<(), StorageError> {
    let models_json = serde_json::to_string(&team.models)
        .map_err(|e| StorageError::Corrupt(format!("models serialize: {e}")))?;
    conn.execute(
        "INSERT INTO teams (id, name, charter, default_model, models_json, created_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            team.id.to_string(),
            team.name,
            team.charter,
            team.default_model,
            models_json,
            team.created_at_ms as i64,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::from(UserError::new(ErrorCode::DuplicateName, format!("team {:?} already exists", team.name)))
        }
        other => other.into(),
    })?;
    Ok(())
}

pub fn delete_team(conn: &Connection, team: TeamId) -> Result<bool, StorageError> {
    let n = conn.execute("DELETE FROM teams WHERE id = ?1", params![team.to_string()])?;
    Ok(n > 0)
}

pub fn get_team(conn: &Connection, team: TeamId) -> Result<Option<Team>, StorageError> {
    conn.query_row(
        "SELECT id, name, charter, default_model, models_json, created_at_ms
         FROM teams WHERE id = ?1",
        params![team.to_string()],
        row_to_team,
    )
    .optional()
    .map_err(Into::into)
}

pub fn team_by_name(conn: &Connection, name: &str) -> Result<Option<Team>, StorageError> {
    conn.query_row(
        "SELECT id, name, charter, default_model, models_json, created_at_ms
         FROM teams WHERE name = ?1",
        params![name],
        row_to_team,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_teams(conn: &Connection) -> Result<Vec<Team>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, charter, default_model, models_json, created_at_ms
         FROM teams ORDER BY created_at_ms",
    )?;
    let rows = stmt.query_map([], row_to_team)?;
    rows.collect::<Result<_, _>>().map_err(Into::into)
}

fn row_to_team(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
    let id: String = row.get(0)?;
    let models_json: String = row.get(4)?;
    let models: HashMap<Role, String> = serde_json::from_str(&models_json).unwrap_or_default();
    Ok(Team {
        id: TeamId::parse(&id).unwrap_or_default(),
        name: row.get(1)?,
        charter: row.get(2)?,
        default_model: row.get(3)?,
        models,
        created_at_ms: row.get::<_, i64>(5)? as u64,
    })
}

// -- agents --

pub fn insert_agent(conn: &Connection, agent: &Agent) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO agents (team_id, name, role, model, created_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            agent.team.to_string(),
            agent.name.as_str(),
            agent.role.to_string(),
            agent.model,
            agent.created_at_ms as i64,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::from(UserError::new(
                ErrorCode::DuplicateName,
                format!("agent {:?} already exists in team", agent.name.as_str()),
            ))
        }
        other => other.into(),
    })?;
    Ok(())
}

pub fn list_agents(conn: &Connection, team: TeamId) -> Result<Vec<Agent>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT name, role, model, created_at_ms FROM agents
         WHERE team_id = ?1 ORDER BY created_at_ms",
    )?;
    let rows = stmt.query_map(params![team.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;
    let mut agents = Vec::new();
    for row in rows {
        let (name, role, model, created) = row?;
        let name = AgentName::parse(&name)
            .map_err(|e| StorageError::Corrupt(format!("agent name: {e}")))?;
        let role = Role::parse(&role)
            .ok_or_else(|| StorageError::Corrupt(format!("agent role: {role:?}")))?;
        agents.push(Agent { team, name, role, model, created_at_ms: created as u64 });
    }
    Ok(agents)
}

pub fn get_agent(
    conn: &Connection,
    team: TeamId,
    name: &str,
) -> Result<Option<Agent>, StorageError> {
    Ok(list_agents(conn, team)?.into_iter().find(|a| a.name.as_str() == name))
}

// -- repos --

pub fn insert_repo(conn: &Connection, team: TeamId, repo: &RepoConfig) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO repos (team_id, name, path, target_branch, premerge_cmd, approval)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (team_id, name) DO UPDATE SET
            path = excluded.path,
            target_branch = excluded.target_branch,
            premerge_cmd = excluded.premerge_cmd,
            approval = excluded.approval",
        params![
            team.to_string(),
            repo.name.as_str(),
            repo.path.display().to_string(),
            repo.target_branch,
            repo.premerge_cmd,
            repo.approval.to_string(),
        ],
    )?;
    Ok(())
}

pub fn set_repo_approval(
    conn: &Connection,
    team: TeamId,
    repo: &RepoName,
    approval: ApprovalPolicy,
) -> Result<bool, StorageError> {
    let n = conn.execute(
        "UPDATE repos SET approval = ?3 WHERE team_id = ?1 AND name = ?2",
        params![team.to_string(), repo.as_str(), approval.to_string()],
    )?;
    Ok(n > 0)
}

pub fn list_repos(conn: &Connection, team: TeamId) -> Result<Vec<RepoConfig>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT name, path, target_branch, premerge_cmd, approval FROM repos
         WHERE team_id = ?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![team.to_string()], |row| {
        Ok(RepoConfig {
            name: RepoName(row.get::<_, String>(0)?),
            path: PathBuf::from(row.get::<_, String>(1)?),
            target_branch: row.get(2)?,
            premerge_cmd: row.get(3)?,
            approval: ApprovalPolicy::parse(&row.get::<_, String>(4)?).unwrap_or_default(),
        })
    })?;
    rows.collect::<Result<_, _>>().map_err(Into::into)
}

pub fn get_repo(
    conn: &Connection,
    team: TeamId,
    name: &str,
) -> Result<Option<RepoConfig>, StorageError> {
    Ok(list_repos(conn, team)?.into_iter().find(|r| r.name.as_str() == name))
}

#[cfg(test)]
#[path = "teams_tests.rs"]
mod tests;
