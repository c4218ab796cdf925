// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred-effect executor.
//!
//! Stage hooks run inside the transition transaction and may only describe
//! outside-world work; this executor performs it after commit. Follow-up
//! task events (`Raise`) loop back through a channel the daemon pumps into
//! [`crate::WorkflowEngine::apply_event`], which keeps the engine free of
//! self-references.

use crate::context::EngineCtx;
use crate::worktree;
use dg_core::{Clock, TaskEventKind, TaskId};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Outside-world work produced by a committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Provision worktrees for every repo in the task's repo set.
    SetupWorktree { task: TaskId },
    /// Tear down the task's worktrees and branch.
    RemoveWorktree { task: TaskId },
    /// Hand the task to the serialized merge worker.
    EnqueueMerge { task: TaskId },
    /// Run a script with empty stdin.
    RunScript { command: String, cwd: PathBuf },
    /// Feed a follow-up event back into the workflow engine.
    Raise { task: TaskId, kind: TaskEventKind },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::SetupWorktree { .. } => "setup_worktree",
            Effect::RemoveWorktree { .. } => "remove_worktree",
            Effect::EnqueueMerge { .. } => "enqueue_merge",
            Effect::RunScript { .. } => "run_script",
            Effect::Raise { .. } => "raise",
        }
    }
}

#[derive(Clone)]
pub struct Executor<C: Clock> {
    ctx: EngineCtx<C>,
    merge_tx: mpsc::Sender<TaskId>,
    raise_tx: mpsc::Sender<(TaskId, TaskEventKind)>,
}

impl<C: Clock + 'static> Executor<C> {
    pub fn new(
        ctx: EngineCtx<C>,
        merge_tx: mpsc::Sender<TaskId>,
        raise_tx: mpsc::Sender<(TaskId, TaskEventKind)>,
    ) -> Self {
        Self { ctx, merge_tx, raise_tx }
    }

    pub async fn execute_all(&self, effects: Vec<Effect>) {
        for effect in effects {
            let name = effect.name();
            if let Err(e) = self.execute(effect).await {
                tracing::error!(effect = name, error = %e, "effect execution failed");
            }
        }
    }

    async fn execute(&self, effect: Effect) -> Result<(), crate::EngineError> {
        tracing::debug!(effect = effect.name(), "executing effect");
        match effect {
            Effect::SetupWorktree { task } => {
                // Runs in the background; worktree creation is git-speed,
                // not tick-speed. Failures surface as events.
                let ctx = self.ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = worktree::setup(&ctx, task).await {
                        tracing::error!(%task, error = %e, "worktree setup failed");
                    }
                });
                Ok(())
            }
            Effect::RemoveWorktree { task } => {
                let ctx = self.ctx.clone();
                tokio::spawn(async move {
                    worktree::remove_worktrees(&ctx, task).await;
                });
                Ok(())
            }
            Effect::EnqueueMerge { task } => {
                self.merge_tx
                    .send(task)
                    .await
                    .map_err(|_| crate::EngineError::Git("merge worker gone".into()))
            }
            Effect::RunScript { command, cwd } => {
                let mut cmd = tokio::process::Command::new("bash");
                cmd.arg("-c").arg(&command).current_dir(&cwd);
                let output = crate::subprocess::run_with_timeout(
                    cmd,
                    std::time::Duration::from_secs(600),
                    "stage script",
                )
                .await
                .map_err(|e| crate::EngineError::Git(e.to_string()))?;
                if !output.status.success() {
                    tracing::warn!(
                        command,
                        code = output.status.code(),
                        "stage script exited non-zero"
                    );
                }
                Ok(())
            }
            Effect::Raise { task, kind } => self
                .raise_tx
                .send((task, kind))
                .await
                .map_err(|_| crate::EngineError::Git("raise channel gone".into())),
        }
    }
}
