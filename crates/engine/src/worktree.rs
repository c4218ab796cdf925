// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task worktree lifecycle.
//!
//! One worktree per (task, repo), checked out on the task's branch at
//! `teams/<uuid>/agents/<assignee>/tasks/T####/<repo>/`. The daemon is the
//! only actor that ever runs the git verbs involved.

use crate::context::EngineCtx;
use crate::error::{EngineError, GateError};
use crate::git;
use dg_core::{AgentName, Clock, Event, RepoConfig, Task};
use dg_core::TaskId;
use dg_storage::tasks;
use std::collections::BTreeMap;

/// Provision worktrees for every repo in the task's repo set.
///
/// Captures `base_sha = rev-parse target_branch` per repo, creates the
/// worktree on the task branch, persists the (immutable) base shas, and
/// emits `worktree:created` events; the persistence and events commit in
/// one transaction after all checkouts succeed.
pub async fn setup<C: Clock>(ctx: &EngineCtx<C>, task_id: TaskId) -> Result<(), EngineError> {
    let (task, repos, assignee) = load(ctx, task_id)?;

    if task.has_worktree() {
        return Ok(());
    }
    let open = ctx.store.read(|conn| {
        Ok(!dg_storage::tasks::deps_terminal(conn, task_id)?)
    })?;
    if open {
        return Err(GateError { task: task_id, open: task.depends_on.len() }.into());
    }

    let mut created: Vec<(RepoConfig, std::path::PathBuf, String)> = Vec::new();
    let mut base_shas = BTreeMap::new();
    for repo in &repos {
        let base_sha = git::rev_parse(&repo.path, &repo.target_branch).await?;
        let path = ctx.layout.worktree_dir(task.team, &assignee, task.id, &repo.name);
        match git::worktree_add(&repo.path, &path, &task.branch, &base_sha).await {
            Ok(()) => {
                base_shas.insert(repo.name.clone(), base_sha.clone());
                created.push((repo.clone(), path, base_sha));
            }
            Err(e) => {
                // Unwind the checkouts that already succeeded.
                for (repo, path, _) in &created {
                    git::worktree_remove(&repo.path, path, Some(&task.branch)).await;
                }
                return Err(e);
            }
        }
    }

    ctx.commit(|tx| {
        tasks::capture_base_shas(tx.conn(), task.id, &base_shas, tx.now_ms())?;
        for (repo, path, base_sha) in &created {
            tx.emit(
                task.team,
                Event::WorktreeCreated {
                    task: task.id,
                    repo: repo.name.to_string(),
                    path: path.clone(),
                    branch: task.branch.clone(),
                    base_sha: base_sha.clone(),
                },
            )?;
        }
        Ok(())
    })?;
    tracing::info!(task = %task.id, repos = created.len(), "worktrees provisioned");
    Ok(())
}

/// Remove every worktree of a task (terminal cleanup). Best-effort on the
/// git side; the base shas are cleared and `worktree:removed` is emitted.
pub async fn remove_worktrees<C: Clock>(ctx: &EngineCtx<C>, task_id: TaskId) {
    let loaded = load(ctx, task_id);
    let (task, repos, assignee) = match loaded {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%task_id, error = %e, "worktree removal: task lookup failed");
            return;
        }
    };
    if !task.has_worktree() {
        return;
    }

    for repo in &repos {
        let path = ctx.layout.worktree_dir(task.team, &assignee, task.id, &repo.name);
        git::worktree_remove(&repo.path, &path, Some(&task.branch)).await;
    }
    let task_dir = ctx.layout.task_dir(task.team, &assignee, task.id);
    let _ = tokio::fs::remove_dir_all(&task_dir).await;

    let result = ctx.commit(|tx| {
        tasks::clear_base_shas(tx.conn(), task.id, tx.now_ms())?;
        tx.emit(task.team, Event::WorktreeRemoved { task: task.id })?;
        Ok(())
    });
    if let Err(e) = result {
        tracing::error!(task = %task.id, error = %e, "worktree removal bookkeeping failed");
    }
}

/// Task + the repo configs in its repo set + the assignee owning the
/// worktree directory.
fn load<C: Clock>(
    ctx: &EngineCtx<C>,
    task_id: TaskId,
) -> Result<(Task, Vec<RepoConfig>, AgentName), EngineError> {
    let (task, repos) = ctx.store.read(|conn| {
        let task = tasks::require(conn, task_id)?;
        let all = dg_storage::teams::list_repos(conn, task.team)?;
        let repos: Vec<RepoConfig> =
            all.into_iter().filter(|r| task.repos.contains(&r.name)).collect();
        Ok((task, repos))
    })?;
    let assignee = task.assignee.clone().unwrap_or_else(|| "unassigned".to_string());
    let assignee = AgentName::parse(&assignee)
        .map_err(|e| EngineError::Git(format!("bad assignee for worktree path: {e}")))?;
    Ok((task, repos, assignee))
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
