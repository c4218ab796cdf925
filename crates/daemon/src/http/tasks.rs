// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task endpoints.

use super::{ApiError, AppState};
use crate::protocol::{
    ApproveRequest, FileResponse, RejectRequest, ReviewerEditsRequest, TaskDetail, TaskStats,
};
use axum::extract::{Path as AxumPath, Query, State};
use axum::Json;
use dg_core::task::ApprovalStatus;
use dg_core::{AgentName, Event, RepoName, Task, TaskEventKind, TaskId};
use dg_engine::git;
use dg_storage::{reviews, tasks, usage, TaskFilter};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub all: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let team = match &query.team {
        Some(key) => Some(super::resolve_team(&state, key)?.id),
        None => None,
    };
    let filter = TaskFilter { team, include_terminal: query.all, ..Default::default() };
    let list = state.store.read(|conn| tasks::list(conn, &filter))?;
    Ok(Json(list))
}

pub async fn show(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<TaskDetail>, ApiError> {
    let id = TaskId(id);
    let detail = state.store.read(|conn| {
        let task = tasks::require(conn, id)?;
        let reviews = reviews::for_task(conn, id)?;
        Ok(TaskDetail { task, reviews })
    })?;
    Ok(Json(detail))
}

pub async fn stats(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<TaskStats>, ApiError> {
    let id = TaskId(id);
    let stats = state.store.read(|conn| {
        tasks::require(conn, id)?;
        let usage = usage::task_totals(conn, id)?;
        let review_attempts = reviews::for_task(conn, id)?.len();
        Ok(TaskStats { usage, review_attempts })
    })?;
    Ok(Json(stats))
}

/// Unified diff of every repo worktree against its captured base sha,
/// served as plain text.
pub async fn diff(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<String, ApiError> {
    let id = TaskId(id);
    let task = state.store.read(|conn| tasks::require(conn, id))?;
    let mut combined = String::new();
    for (repo, base_sha) in &task.base_shas {
        let worktree = worktree_path(&state, &task, repo)?;
        match git::diff_against(&worktree, base_sha).await {
            Ok(diff) if !diff.is_empty() => {
                combined.push_str(&format!("# repo: {repo}\n"));
                combined.push_str(&diff);
                combined.push('\n');
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(task = %id, %repo, error = %e, "diff failed");
            }
        }
    }
    Ok(combined)
}

#[derive(Deserialize)]
pub struct FileQuery {
    /// `<repo>/<relative path>` inside the task worktree.
    pub path: String,
}

pub async fn file(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Query(query): Query<FileQuery>,
) -> Result<Json<FileResponse>, ApiError> {
    let id = TaskId(id);
    let task = state.store.read(|conn| tasks::require(conn, id))?;
    let (repo, rel) = split_repo_path(&query.path)?;
    let worktree = worktree_path(&state, &task, &repo)?;

    let full = worktree.join(&rel);
    if !full.starts_with(&worktree) {
        return Err(ApiError::bad_request("path escapes the worktree"));
    }
    let content = std::fs::read_to_string(&full)
        .map_err(|_| ApiError::not_found(format!("file {:?}", query.path)))?;
    let expected_sha = git::rev_parse(&worktree, "HEAD").await?;
    Ok(Json(FileResponse { repo: repo.to_string(), path: rel, content, expected_sha }))
}

/// Reviewer edits: full file contents guarded by the head sha captured at
/// load. A stale sha means someone moved the branch: 409, no write.
pub async fn reviewer_edits(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Json(body): Json<ReviewerEditsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = TaskId(id);
    let task = state.store.read(|conn| tasks::require(conn, id))?;
    let repo = RepoName::from(body.repo.as_str());
    let worktree = worktree_path(&state, &task, &repo)?;

    let head = git::rev_parse(&worktree, "HEAD").await?;
    if head != body.expected_sha {
        return Err(ApiError::conflict(
            "stale_sha",
            format!("expected {} but branch is at {head}", body.expected_sha),
        ));
    }

    for edit in &body.files {
        let full = worktree.join(&edit.path);
        if !full.starts_with(&worktree) {
            return Err(ApiError::bad_request("path escapes the worktree"));
        }
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::bad_request(e.to_string()))?;
        }
        std::fs::write(&full, &edit.content).map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    // Same content as HEAD is a no-op: idempotent by construction.
    let new_sha = git::commit_all(
        &worktree,
        &format!("reviewer edits by {}", body.by.as_deref().unwrap_or("reviewer")),
    )
    .await?;

    Ok(Json(serde_json::json!({
        "task": id.0,
        "changed": new_sha.is_some(),
        "sha": new_sha.unwrap_or(head),
    })))
}

pub async fn approve(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = TaskId(id);
    state.ctx.commit(|tx| {
        let task = tasks::require(tx.conn(), id)?;
        tasks::set_approval(tx.conn(), id, ApprovalStatus::Approved, None, tx.now_ms())?;
        tx.emit(task.team, Event::TaskApproved { task: id, by: body.by.clone() })?;
        Ok(())
    })?;
    state.engine.apply_event(id, TaskEventKind::ApprovalGranted).await?;
    let task = state.store.read(|conn| tasks::require(conn, id))?;
    Ok(Json(serde_json::json!({"task": id.0, "status": task.status.to_string()})))
}

pub async fn reject(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = TaskId(id);
    state.ctx.commit(|tx| {
        let task = tasks::require(tx.conn(), id)?;
        tasks::set_approval(
            tx.conn(),
            id,
            ApprovalStatus::Rejected,
            Some(&body.reason),
            tx.now_ms(),
        )?;
        tx.emit(
            task.team,
            Event::TaskRejected { task: id, by: body.by.clone(), reason: body.reason.clone() },
        )?;
        Ok(())
    })?;
    state.engine.apply_event(id, TaskEventKind::ApprovalDenied).await?;
    let task = state.store.read(|conn| tasks::require(conn, id))?;
    Ok(Json(serde_json::json!({"task": id.0, "status": task.status.to_string()})))
}

/// Explicit retry of a failed merge; refused while any dependency is
/// non-terminal.
pub async fn retry_merge(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = TaskId(id);
    if !dg_engine::can_retry(&state.ctx, id)? {
        return Err(ApiError::conflict(
            "deps_unresolved",
            "cannot retry while a dependency is non-terminal",
        ));
    }
    state.engine.apply_event(id, TaskEventKind::RetryRequested).await?;
    let task = state.store.read(|conn| tasks::require(conn, id))?;
    Ok(Json(serde_json::json!({"task": id.0, "status": task.status.to_string()})))
}

fn split_repo_path(path: &str) -> Result<(RepoName, String), ApiError> {
    let mut parts = path.splitn(2, '/');
    let repo = parts.next().filter(|p| !p.is_empty());
    let rel = parts.next().filter(|p| !p.is_empty());
    match (repo, rel) {
        (Some(repo), Some(rel)) if !rel.contains("..") => {
            Ok((RepoName::from(repo), rel.to_string()))
        }
        _ => Err(ApiError::bad_request("path must be <repo>/<relative path>")),
    }
}

fn worktree_path(state: &AppState, task: &Task, repo: &RepoName) -> Result<PathBuf, ApiError> {
    let assignee = task
        .assignee
        .as_deref()
        .and_then(|a| AgentName::parse(a).ok())
        .ok_or_else(|| ApiError::bad_request("task has no assignee worktree"))?;
    Ok(state.layout.worktree_dir(task.team, &assignee, task.id, repo))
}
