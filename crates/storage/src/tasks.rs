// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task rows and the dependency edge table.

use crate::error::StorageError;
use dg_core::task::ApprovalStatus;
use dg_core::{
    ErrorCode, Priority, RepoName, StageKey, Task, TaskId, TeamId, UserError, WorkflowRef,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};

/// Fields supplied when creating a task; everything else is derived.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub dri: Option<String>,
    pub assignee: Option<String>,
    pub reviewer: Option<String>,
    pub depends_on: BTreeSet<TaskId>,
    pub repos: BTreeSet<RepoName>,
    pub workflow: WorkflowRef,
    pub initial_status: StageKey,
}

impl NewTask {
    pub fn new(title: impl Into<String>, workflow: WorkflowRef) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::Normal,
            dri: None,
            assignee: None,
            reviewer: None,
            depends_on: BTreeSet::new(),
            repos: BTreeSet::new(),
            workflow,
            initial_status: StageKey::new(StageKey::TODO),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on(mut self, deps: BTreeSet<TaskId>) -> Self {
        self.depends_on = deps;
        self
    }

    pub fn repos(mut self, repos: BTreeSet<RepoName>) -> Self {
        self.repos = repos;
        self
    }

    pub fn dri(mut self, dri: impl Into<String>) -> Self {
        self.dri = Some(dri.into());
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn reviewer(mut self, reviewer: impl Into<String>) -> Self {
        self.reviewer = Some(reviewer.into());
        self
    }
}

/// Filter for task listings.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub team: Option<TeamId>,
    pub status: Option<StageKey>,
    pub assignee: Option<String>,
    pub include_terminal: bool,
}

/// Insert a task and its dependency edges. The branch name needs the rowid,
/// so the row is created first and the branch filled in the same transaction.
pub fn insert(
    conn: &Connection,
    team: TeamId,
    team_name: &str,
    new: &NewTask,
    now_ms: u64,
) -> Result<Task, StorageError> {
    conn.execute(
        "INSERT INTO tasks (team_id, title, description, priority, status, assignee, dri,
                            reviewer, branch, repos_json, workflow_name, workflow_version,
                            created_at_ms, updated_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, '', ?9, ?10, ?11, ?12, ?12)",
        params![
            team.to_string(),
            new.title,
            new.description,
            new.priority.to_string(),
            new.initial_status.as_str(),
            new.assignee,
            new.dri,
            new.reviewer,
            serde_json::to_string(&new.repos)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?,
            new.workflow.name,
            new.workflow.version,
            now_ms as i64,
        ],
    )?;
    let id = TaskId(conn.last_insert_rowid());
    let branch = Task::branch_name(team_name, id);
    conn.execute("UPDATE tasks SET branch = ?2 WHERE id = ?1", params![id.0, branch])?;

    for dep in &new.depends_on {
        insert_dep_edge(conn, id, *dep)?;
    }

    get(conn, id)?.ok_or_else(|| StorageError::Corrupt(format!("task {id} vanished after insert")))
}

pub fn get(conn: &Connection, id: TaskId) -> Result<Option<Task>, StorageError> {
    let task = conn
        .query_row("SELECT * FROM tasks WHERE id = ?1", params![id.0], row_to_task)
        .optional()?;
    match task {
        Some(mut task) => {
            task.depends_on = deps_of(conn, id)?;
            Ok(Some(task))
        }
        None => Ok(None),
    }
}

/// Fetch a task or fail with a user error.
pub fn require(conn: &Connection, id: TaskId) -> Result<Task, StorageError> {
    get(conn, id)?
        .ok_or_else(|| UserError::new(ErrorCode::UnknownTask, format!("no task {id}")).into())
}

pub fn list(conn: &Connection, filter: &TaskFilter) -> Result<Vec<Task>, StorageError> {
    let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    if let Some(team) = filter.team {
        sql.push_str(" AND team_id = ?");
        args.push(Box::new(team.to_string()));
    }
    if let Some(ref status) = filter.status {
        sql.push_str(" AND status = ?");
        args.push(Box::new(status.as_str().to_string()));
    }
    if let Some(ref assignee) = filter.assignee {
        sql.push_str(" AND assignee = ?");
        args.push(Box::new(assignee.clone()));
    }
    if !filter.include_terminal {
        sql.push_str(" AND status NOT IN ('done', 'cancelled', 'rejected')");
    }
    sql.push_str(" ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn rusqlite::types::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt.query_map(&refs[..], row_to_task)?;
    let mut tasks: Vec<Task> = rows.collect::<Result<_, _>>()?;
    for task in &mut tasks {
        task.depends_on = deps_of(conn, task.id)?;
    }
    Ok(tasks)
}

/// Update the stage, stamping `completed_at_ms` on terminal arrival and
/// clearing stale detail on departure from a failure stage.
pub fn set_status(
    conn: &Connection,
    id: TaskId,
    status: &StageKey,
    detail: Option<&str>,
    now_ms: u64,
) -> Result<(), StorageError> {
    let completed: Option<i64> = status.is_terminal().then_some(now_ms as i64);
    conn.execute(
        "UPDATE tasks SET status = ?2, status_detail = ?3, completed_at_ms = ?4,
                          updated_at_ms = ?5
         WHERE id = ?1",
        params![id.0, status.as_str(), detail, completed, now_ms as i64],
    )?;
    Ok(())
}

pub fn set_assignee(
    conn: &Connection,
    id: TaskId,
    assignee: Option<&str>,
    now_ms: u64,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE tasks SET assignee = ?2, updated_at_ms = ?3 WHERE id = ?1",
        params![id.0, assignee, now_ms as i64],
    )?;
    Ok(())
}

pub fn set_reviewer(
    conn: &Connection,
    id: TaskId,
    reviewer: Option<&str>,
    now_ms: u64,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE tasks SET reviewer = ?2, updated_at_ms = ?3 WHERE id = ?1",
        params![id.0, reviewer, now_ms as i64],
    )?;
    Ok(())
}

pub fn set_approval(
    conn: &Connection,
    id: TaskId,
    approval: ApprovalStatus,
    rejection_reason: Option<&str>,
    now_ms: u64,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE tasks SET approval_status = ?2, rejection_reason = ?3, updated_at_ms = ?4
         WHERE id = ?1",
        params![id.0, approval.to_string(), rejection_reason, now_ms as i64],
    )?;
    Ok(())
}

/// Persist captured base shas. Refuses if any sha is already recorded
/// (base shas are immutable once captured).
pub fn capture_base_shas(
    conn: &Connection,
    id: TaskId,
    shas: &BTreeMap<RepoName, String>,
    now_ms: u64,
) -> Result<(), StorageError> {
    let task = require(conn, id)?;
    if task.has_worktree() {
        return Err(StorageError::Corrupt(format!("task {id} base_sha already captured")));
    }
    conn.execute(
        "UPDATE tasks SET base_shas_json = ?2, updated_at_ms = ?3 WHERE id = ?1",
        params![
            id.0,
            serde_json::to_string(shas).map_err(|e| StorageError::Corrupt(e.to_string()))?,
            now_ms as i64,
        ],
    )?;
    Ok(())
}

/// Clear base shas after the worktree is torn down (terminal cleanup).
pub fn clear_base_shas(conn: &Connection, id: TaskId, now_ms: u64) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE tasks SET base_shas_json = '{}', updated_at_ms = ?2 WHERE id = ?1",
        params![id.0, now_ms as i64],
    )?;
    Ok(())
}

pub fn add_attachment(
    conn: &Connection,
    id: TaskId,
    attachment: &str,
    now_ms: u64,
) -> Result<(), StorageError> {
    let task = require(conn, id)?;
    let mut attachments = task.attachments;
    if !attachments.iter().any(|a| a == attachment) {
        attachments.push(attachment.to_string());
    }
    write_attachments(conn, id, &attachments, now_ms)
}

pub fn remove_attachment(
    conn: &Connection,
    id: TaskId,
    attachment: &str,
    now_ms: u64,
) -> Result<(), StorageError> {
    let task = require(conn, id)?;
    let attachments: Vec<String> =
        task.attachments.into_iter().filter(|a| a != attachment).collect();
    write_attachments(conn, id, &attachments, now_ms)
}

fn write_attachments(
    conn: &Connection,
    id: TaskId,
    attachments: &[String],
    now_ms: u64,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE tasks SET attachments_json = ?2, updated_at_ms = ?3 WHERE id = ?1",
        params![
            id.0,
            serde_json::to_string(attachments).map_err(|e| StorageError::Corrupt(e.to_string()))?,
            now_ms as i64,
        ],
    )?;
    Ok(())
}

// -- dependencies --

pub fn deps_of(conn: &Connection, id: TaskId) -> Result<BTreeSet<TaskId>, StorageError> {
    let mut stmt =
        conn.prepare("SELECT depends_on FROM task_deps WHERE task_id = ?1 ORDER BY depends_on")?;
    let rows = stmt.query_map(params![id.0], |r| r.get::<_, i64>(0))?;
    let mut deps = BTreeSet::new();
    for row in rows {
        deps.insert(TaskId(row?));
    }
    Ok(deps)
}

/// True when every dependency of `id` is in a terminal stage.
pub fn deps_terminal(conn: &Connection, id: TaskId) -> Result<bool, StorageError> {
    let open: i64 = conn.query_row(
        "SELECT COUNT(*) FROM task_deps d
         JOIN tasks t ON t.id = d.depends_on
         WHERE d.task_id = ?1 AND t.status NOT IN ('done', 'cancelled', 'rejected')",
        params![id.0],
        |r| r.get(0),
    )?;
    Ok(open == 0)
}

/// Add a dependency, enforcing the freeze rule.
pub fn add_dependency(
    conn: &Connection,
    id: TaskId,
    dep: TaskId,
    now_ms: u64,
) -> Result<(), StorageError> {
    let task = require(conn, id)?;
    require(conn, dep)?;
    let frozen = deps_terminal(conn, id)?;
    task.check_add_dependency(dep, frozen)
        .map_err(|e| UserError::new(ErrorCode::DepsFrozen, e.to_string()))?;
    insert_dep_edge(conn, id, dep)?;
    conn.execute("UPDATE tasks SET updated_at_ms = ?2 WHERE id = ?1", params![id.0, now_ms as i64])?;
    Ok(())
}

/// Remove a dependency. Always permitted.
pub fn remove_dependency(
    conn: &Connection,
    id: TaskId,
    dep: TaskId,
    now_ms: u64,
) -> Result<bool, StorageError> {
    let n = conn.execute(
        "DELETE FROM task_deps WHERE task_id = ?1 AND depends_on = ?2",
        params![id.0, dep.0],
    )?;
    if n > 0 {
        conn.execute(
            "UPDATE tasks SET updated_at_ms = ?2 WHERE id = ?1",
            params![id.0, now_ms as i64],
        )?;
    }
    Ok(n > 0)
}

fn insert_dep_edge(conn: &Connection, id: TaskId, dep: TaskId) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR IGNORE INTO task_deps (task_id, depends_on) VALUES (?1, ?2)",
        params![id.0, dep.0],
    )?;
    Ok(())
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let team: String = row.get("team_id")?;
    let repos_json: String = row.get("repos_json")?;
    let base_shas_json: String = row.get("base_shas_json")?;
    let attachments_json: String = row.get("attachments_json")?;
    Ok(Task {
        id: TaskId(row.get("id")?),
        team: TeamId::parse(&team).unwrap_or_default(),
        title: row.get("title")?,
        description: row.get("description")?,
        priority: Priority::parse(&row.get::<_, String>("priority")?).unwrap_or_default(),
        status: StageKey::new(row.get::<_, String>("status")?),
        assignee: row.get("assignee")?,
        dri: row.get("dri")?,
        reviewer: row.get("reviewer")?,
        depends_on: BTreeSet::new(),
        repos: serde_json::from_str(&repos_json).unwrap_or_default(),
        branch: row.get("branch")?,
        base_shas: serde_json::from_str(&base_shas_json).unwrap_or_default(),
        attachments: serde_json::from_str(&attachments_json).unwrap_or_default(),
        approval_status: ApprovalStatus::parse(&row.get::<_, String>("approval_status")?)
            .unwrap_or_default(),
        rejection_reason: row.get("rejection_reason")?,
        status_detail: row.get("status_detail")?,
        workflow_name: row.get("workflow_name")?,
        workflow_version: row.get("workflow_version")?,
        created_at_ms: row.get::<_, i64>("created_at_ms")? as u64,
        updated_at_ms: row.get::<_, i64>("updated_at_ms")? as u64,
        completed_at_ms: row.get::<_, Option<i64>>("completed_at_ms")?.map(|v| v as u64),
    })
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
