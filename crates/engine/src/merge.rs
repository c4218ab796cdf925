// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The serialized merge worker.
//!
//! One merge in flight per installation. For each queued task: rebase the
//! task branch onto the current target tip (squash-reapply fallback on
//! conflicts), run the repo's pre-merge command, then fast-forward the
//! target. Merge commits are never created.

use crate::context::EngineCtx;
use crate::error::EngineError;
use crate::git;
use crate::subprocess::{run_with_timeout, tail, SubprocessError};
use crate::workflow::WorkflowEngine;
use dg_core::{
    Clock, Event, MergeFailureReason, RepoConfig, Task, TaskEventKind, TaskId,
};
use dg_storage::tasks;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default pre-merge test timeout.
pub const DEFAULT_PREMERGE_TIMEOUT: Duration = Duration::from_secs(600);

pub struct MergeWorker<C: Clock> {
    ctx: EngineCtx<C>,
    engine: Arc<WorkflowEngine<C>>,
    rx: mpsc::Receiver<TaskId>,
    premerge_timeout: Duration,
    cancel: CancellationToken,
}

impl<C: Clock + 'static> MergeWorker<C> {
    pub fn new(
        ctx: EngineCtx<C>,
        engine: Arc<WorkflowEngine<C>>,
        rx: mpsc::Receiver<TaskId>,
        premerge_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self { ctx, engine, rx, premerge_timeout, cancel }
    }

    /// Drain the queue until shutdown. Merges are strictly serialized.
    pub async fn run(mut self) {
        loop {
            let task = tokio::select! {
                task = self.rx.recv() => match task {
                    Some(task) => task,
                    None => return,
                },
                _ = self.cancel.cancelled() => return,
            };
            self.process(task).await;
        }
    }

    pub(crate) async fn process(&self, task_id: TaskId) {
        match self.merge_one(task_id).await {
            Ok(()) => {
                if let Err(e) = self.engine.apply_event(task_id, TaskEventKind::MergeSucceeded).await
                {
                    tracing::error!(task = %task_id, error = %e, "post-merge transition failed");
                }
            }
            Err(MergeOutcome::Failed(reason)) => {
                let summary = reason.summary();
                let record = self.ctx.commit(|tx| {
                    tasks::set_status(
                        tx.conn(),
                        task_id,
                        &dg_core::StageKey::new(dg_core::StageKey::MERGING),
                        Some(&summary),
                        tx.now_ms(),
                    )?;
                    let team = tasks::require(tx.conn(), task_id)?.team;
                    tx.emit(team, Event::MergeFailed { task: task_id, reason: reason.clone() })?;
                    Ok(())
                });
                if let Err(e) = record {
                    tracing::error!(task = %task_id, error = %e, "merge failure bookkeeping failed");
                }
                if let Err(e) = self.engine.apply_event(task_id, TaskEventKind::MergeFailed).await {
                    tracing::error!(task = %task_id, error = %e, "merge-failed transition failed");
                }
            }
            Err(MergeOutcome::Skipped(why)) => {
                tracing::info!(task = %task_id, why, "merge skipped");
            }
        }
    }

    /// One merge attempt across every repo in the task's repo set.
    async fn merge_one(&self, task_id: TaskId) -> Result<(), MergeOutcome> {
        let (task, repos) = self.load(task_id)?;
        if task.status != dg_core::StageKey::MERGING {
            return Err(MergeOutcome::Skipped(format!("status is {}", task.status)));
        }

        let started = self.ctx.commit(|tx| {
            tx.emit(task.team, Event::MergeStarted { task: task_id })?;
            Ok(())
        });
        if let Err(e) = started {
            tracing::warn!(task = %task_id, error = %e, "merge-started event failed");
        }

        for repo in &repos {
            self.merge_repo(&task, repo).await?;
        }
        Ok(())
    }

    async fn merge_repo(&self, task: &Task, repo: &RepoConfig) -> Result<(), MergeOutcome> {
        let scratch = self.ctx.layout.merge_dir(task.team, task.id, &repo.name);

        git::fetch_if_remote(&repo.path).await.map_err(git_failure)?;

        // Rebase happens in a detached scratch worktree so neither the
        // agent's worktree nor the user's checkout is disturbed.
        git::worktree_add_detached(&repo.path, &scratch, &task.branch)
            .await
            .map_err(git_failure)?;
        let result = self.rebase_test_ff(task, repo, &scratch).await;
        git::worktree_remove(&repo.path, &scratch, None).await;
        result
    }

    async fn rebase_test_ff(
        &self,
        task: &Task,
        repo: &RepoConfig,
        scratch: &std::path::Path,
    ) -> Result<(), MergeOutcome> {
        let target_tip = git::rev_parse(&repo.path, &repo.target_branch).await.map_err(git_failure)?;

        let rebased = git::rebase_onto(scratch, &target_tip).await.map_err(git_failure)?;
        if !rebased {
            // Squash-reapply fallback: start over from the target tip and
            // squash the branch in, favoring the branch side for the files
            // it modified.
            git::worktree_remove(&repo.path, scratch, None).await;
            git::worktree_add_detached(&repo.path, scratch, &target_tip)
                .await
                .map_err(git_failure)?;
            let message = format!("{}: {} (squashed)", task.id, task.title);
            match git::squash_merge_theirs(scratch, &task.branch, &message)
                .await
                .map_err(git_failure)?
            {
                Ok(()) => {}
                Err(files) => {
                    return Err(MergeOutcome::Failed(MergeFailureReason::Conflicts { files }));
                }
            }
        }

        if let Some(command) = &repo.premerge_cmd {
            self.run_premerge(command, scratch).await?;
        }

        let tip = git::rev_parse(scratch, "HEAD").await.map_err(git_failure)?;
        git::fast_forward(&repo.path, &repo.target_branch, &tip).await.map_err(git_failure)?;

        let record = self.ctx.commit(|tx| {
            tx.emit(
                task.team,
                Event::MergeSucceeded {
                    task: task.id,
                    repo: repo.name.to_string(),
                    tip: tip.clone(),
                },
            )?;
            Ok(())
        });
        if let Err(e) = record {
            tracing::warn!(task = %task.id, error = %e, "merge-succeeded event failed");
        }
        Ok(())
    }

    async fn run_premerge(
        &self,
        command: &str,
        cwd: &std::path::Path,
    ) -> Result<(), MergeOutcome> {
        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg("-c").arg(command).current_dir(cwd);
        match run_with_timeout(cmd, self.premerge_timeout, "pre-merge command").await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(MergeOutcome::Failed(MergeFailureReason::TestFailed {
                command: command.to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                output: tail(&output, 40),
            })),
            Err(SubprocessError::Timeout { .. }) => {
                Err(MergeOutcome::Failed(MergeFailureReason::TestTimeout {
                    command: command.to_string(),
                    timeout_secs: self.premerge_timeout.as_secs(),
                }))
            }
            Err(e) => Err(MergeOutcome::Failed(MergeFailureReason::GitError {
                detail: e.to_string(),
            })),
        }
    }

    fn load(&self, task_id: TaskId) -> Result<(Task, Vec<RepoConfig>), MergeOutcome> {
        self.ctx
            .store
            .read(|conn| {
                let task = tasks::require(conn, task_id)?;
                let all = dg_storage::teams::list_repos(conn, task.team)?;
                let repos: Vec<RepoConfig> =
                    all.into_iter().filter(|r| task.repos.contains(&r.name)).collect();
                Ok((task, repos))
            })
            .map_err(|e| MergeOutcome::Skipped(e.to_string()))
    }
}

enum MergeOutcome {
    Failed(MergeFailureReason),
    Skipped(String),
}

fn git_failure(e: EngineError) -> MergeOutcome {
    MergeOutcome::Failed(MergeFailureReason::GitError { detail: e.to_string() })
}

/// Gate for explicit merge retries: refused while any dependency is
/// non-terminal.
pub fn can_retry<C: Clock>(ctx: &EngineCtx<C>, task_id: TaskId) -> Result<bool, EngineError> {
    Ok(ctx.store.read(|conn| tasks::deps_terminal(conn, task_id))?)
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
