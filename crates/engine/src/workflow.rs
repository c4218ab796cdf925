// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow engine: stage hooks, transition table, transactional
//! application.
//!
//! Stages are code (an object-safe trait with four hooks); workflow
//! definitions are data registered by `(name, version)`. Transition
//! application is transactional: the old stage's `exit`, the status write,
//! and the new stage's `enter` commit together or not at all. Effects with
//! an outside-world footprint (worktrees, merges, scripts) are deferred and
//! executed by the [`crate::Executor`] after commit.

use crate::context::EngineCtx;
use crate::error::{EngineError, GateError};
use crate::executor::{Effect, Executor};
use dg_core::{
    Clock, Event, MessageKind, Sender, StageKey, Task, TaskEventKind, TaskId, Team, WorkflowRef,
};
use dg_storage::{tasks, TxCtx};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// The only legal side-effect surface for stage hooks.
///
/// DB-backed operations apply inside the transition transaction; operations
/// that touch git, subprocesses, or queues are deferred as [`Effect`]s and
/// run after commit.
pub struct StageCtx<'a, 'b> {
    tx: &'a mut TxCtx<'b>,
    team: &'a Team,
    effects: &'a mut Vec<Effect>,
}

impl StageCtx<'_, '_> {
    /// Write a stage key directly (branch stages use this from `action`).
    pub fn set_status(&mut self, task: &Task, to: StageKey) -> Result<(), EngineError> {
        let now = self.tx.now_ms();
        tasks::set_status(self.tx.conn(), task.id, &to, None, now)?;
        self.tx.emit(
            self.team.id,
            Event::TaskStage { task: task.id, from: task.status.clone(), to },
        )?;
        Ok(())
    }

    /// Pick (or confirm) the reviewer and ask them to review.
    pub fn create_review(&mut self, task: &Task, reviewer: &str) -> Result<(), EngineError> {
        let now = self.tx.now_ms();
        tasks::set_reviewer(self.tx.conn(), task.id, Some(reviewer), now)?;
        self.send_message(
            reviewer,
            &format!("{} is ready for review: {}", task.id, task.title),
            Some(task.id),
        )?;
        Ok(())
    }

    /// Queue the task for the serialized merge worker.
    pub fn enqueue_merge(&mut self, task: &Task) -> Result<(), EngineError> {
        self.tx.emit(self.team.id, Event::MergeQueued { task: task.id })?;
        self.effects.push(Effect::EnqueueMerge { task: task.id });
        Ok(())
    }

    /// Run a script after commit (hooks never spawn subprocesses directly).
    pub fn run_script(&mut self, command: &str, cwd: std::path::PathBuf) {
        self.effects.push(Effect::RunScript { command: command.to_string(), cwd });
    }

    /// Send a system message into an agent's (or member's) mailbox.
    pub fn send_message(
        &mut self,
        recipient: &str,
        body: &str,
        task: Option<TaskId>,
    ) -> Result<(), EngineError> {
        let now = self.tx.now_ms();
        let message = dg_storage::messages::insert(
            self.tx.conn(),
            self.team.id,
            &Sender::Daemon,
            recipient,
            MessageKind::Event,
            body,
            task,
            now,
        )?;
        self.tx.emit(
            self.team.id,
            Event::MessageSent {
                message: message.id,
                sender: Sender::Daemon,
                recipient: recipient.to_string(),
                kind: MessageKind::Event,
                task,
            },
        )?;
        Ok(())
    }

    /// Provision the task's worktrees once dependencies allow it.
    ///
    /// Refuses with [`GateError`] while any dependency is non-terminal; the
    /// scheduler retries gated tasks on each tick.
    pub fn setup_worktree(&mut self, task: &Task) -> Result<(), EngineError> {
        if !tasks::deps_terminal(self.tx.conn(), task.id)? {
            let open = task.depends_on.len();
            return Err(GateError { task: task.id, open }.into());
        }
        self.effects.push(Effect::SetupWorktree { task: task.id });
        Ok(())
    }

    /// Tear the worktrees down (terminal stages).
    pub fn remove_worktree(&mut self, task: &Task) {
        self.effects.push(Effect::RemoveWorktree { task: task.id });
    }

    /// Raise a follow-up task event after this transition commits
    /// (auto-approval and similar chained moves).
    pub fn raise(&mut self, task: &Task, kind: TaskEventKind) {
        self.effects.push(Effect::Raise { task: task.id, kind });
    }

    pub fn team(&self) -> &Team {
        self.team
    }

    pub fn conn(&self) -> &rusqlite::Connection {
        self.tx.conn()
    }
}

/// A node in a workflow. Hooks default to no-ops; implementations override
/// what they need.
pub trait Stage: Send + Sync {
    fn key(&self) -> StageKey;

    fn label(&self) -> &str;

    fn enter(&self, _ctx: &mut StageCtx<'_, '_>, _task: &Task) -> Result<(), EngineError> {
        Ok(())
    }

    fn exit(&self, _ctx: &mut StageCtx<'_, '_>, _task: &Task) -> Result<(), EngineError> {
        Ok(())
    }

    /// Choose the next assignee; `None` leaves the task unassigned.
    fn assign(&self, _ctx: &mut StageCtx<'_, '_>, _task: &Task) -> Option<String> {
        None
    }

    /// React to an event while the task sits in this stage (only called
    /// when no transition matches).
    fn action(
        &self,
        _ctx: &mut StageCtx<'_, '_>,
        _task: &Task,
        _event: TaskEventKind,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}

/// A named, versioned, ordered sequence of stages plus the transition graph.
pub struct Workflow {
    pub name: String,
    pub version: u32,
    stages: IndexMap<StageKey, Arc<dyn Stage>>,
    transitions: HashMap<(StageKey, TaskEventKind), StageKey>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            stages: IndexMap::new(),
            transitions: HashMap::new(),
        }
    }

    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.insert(stage.key(), stage);
        self
    }

    pub fn transition(mut self, from: &str, on: TaskEventKind, to: &str) -> Self {
        self.transitions.insert((StageKey::new(from), on), StageKey::new(to));
        self
    }

    pub fn reference(&self) -> WorkflowRef {
        WorkflowRef::new(self.name.clone(), self.version)
    }

    pub fn initial_stage(&self) -> Option<StageKey> {
        self.stages.keys().next().cloned()
    }

    pub fn stage_for(&self, key: &StageKey) -> Option<&Arc<dyn Stage>> {
        self.stages.get(key)
    }

    pub fn next_stage(&self, from: &StageKey, on: TaskEventKind) -> Option<&StageKey> {
        self.transitions.get(&(from.clone(), on))
    }

    pub fn stage_keys(&self) -> Vec<StageKey> {
        self.stages.keys().cloned().collect()
    }
}

/// Registry of workflow definitions, keyed by `(name, version)`.
///
/// Stored tasks resolve against the exact version stamped at creation;
/// registering a new version never retroactively affects in-flight tasks.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: Mutex<HashMap<(String, u32), Arc<Workflow>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, workflow: Workflow) -> WorkflowRef {
        let reference = workflow.reference();
        self.workflows
            .lock()
            .insert((workflow.name.clone(), workflow.version), Arc::new(workflow));
        reference
    }

    pub fn get(&self, name: &str, version: u32) -> Option<Arc<Workflow>> {
        self.workflows.lock().get(&(name.to_string(), version)).cloned()
    }

    /// Latest registered version of a workflow, for stamping new tasks.
    pub fn latest(&self, name: &str) -> Option<Arc<Workflow>> {
        self.workflows
            .lock()
            .iter()
            .filter(|((n, _), _)| n == name)
            .max_by_key(|((_, v), _)| *v)
            .map(|(_, w)| Arc::clone(w))
    }
}

/// Applies task events to the stage machine.
pub struct WorkflowEngine<C: Clock> {
    ctx: EngineCtx<C>,
    registry: Arc<WorkflowRegistry>,
    executor: Executor<C>,
    /// Per-task locks serializing transitions.
    locks: Mutex<HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C: Clock + 'static> WorkflowEngine<C> {
    pub fn new(ctx: EngineCtx<C>, registry: Arc<WorkflowRegistry>, executor: Executor<C>) -> Self {
        Self { ctx, registry, executor, locks: Mutex::new(HashMap::new()) }
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    pub fn executor(&self) -> &Executor<C> {
        &self.executor
    }

    fn task_lock(&self, task: TaskId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(task).or_default())
    }

    /// Apply one task event: look up the transition for the task's stamped
    /// workflow, run exit/status/enter transactionally, then execute the
    /// deferred effects. Events with no matching transition go to the
    /// current stage's `action` hook.
    pub async fn apply_event(
        self: &Arc<Self>,
        task_id: TaskId,
        kind: TaskEventKind,
    ) -> Result<(), EngineError> {
        let lock = self.task_lock(task_id);
        let _guard = lock.lock().await;

        let registry = Arc::clone(&self.registry);
        let effects = self.ctx.commit(|tx| {
            let task = tasks::require(tx.conn(), task_id)?;
            let team = dg_storage::teams::get_team(tx.conn(), task.team)?.ok_or_else(|| {
                dg_core::UserError::new(
                    dg_core::ErrorCode::UnknownTeam,
                    format!("team for {task_id} missing"),
                )
            })?;
            let workflow = registry
                .get(&task.workflow_name, task.workflow_version)
                .ok_or_else(|| {
                    dg_storage::StorageError::Corrupt(format!(
                        "workflow {}@v{} not registered",
                        task.workflow_name, task.workflow_version
                    ))
                })?;

            let mut effects = Vec::new();
            apply_in_tx(tx, &team, &workflow, &task, kind, &mut effects)
                .map_err(engine_to_storage)?;
            Ok(effects)
        })?;

        self.executor.execute_all(effects).await;
        Ok(())
    }

    /// Drop the per-task lock entry once a task is terminal (bounds the map).
    pub fn forget_task(&self, task: TaskId) {
        self.locks.lock().remove(&task);
    }
}

/// Bridge: stage hooks yield `EngineError`, but the transaction closure
/// speaks `StorageError`. Storage errors pass through; everything else is
/// wrapped so `kind()` survives where it matters (gating is re-detected by
/// the caller via message text downstream of retry logic).
fn engine_to_storage(e: EngineError) -> dg_storage::StorageError {
    match e {
        EngineError::Storage(inner) => inner,
        EngineError::User(user) => dg_storage::StorageError::User(user),
        other => dg_storage::StorageError::Corrupt(other.to_string()),
    }
}

fn apply_in_tx(
    tx: &mut TxCtx<'_>,
    team: &Team,
    workflow: &Workflow,
    task: &Task,
    kind: TaskEventKind,
    effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
    let Some(to_key) = workflow.next_stage(&task.status, kind).cloned() else {
        // No transition: hand the event to the current stage's action hook.
        if let Some(stage) = workflow.stage_for(&task.status) {
            let mut ctx = StageCtx { tx: &mut *tx, team, effects: &mut *effects };
            stage.action(&mut ctx, task, kind)?;
        }
        return Ok(());
    };

    let from_stage = workflow
        .stage_for(&task.status)
        .cloned()
        .ok_or_else(|| EngineError::UnknownStage(task.status.to_string()))?;
    let to_stage = workflow
        .stage_for(&to_key)
        .cloned()
        .ok_or_else(|| EngineError::UnknownStage(to_key.to_string()))?;

    {
        let mut ctx = StageCtx { tx: &mut *tx, team, effects: &mut *effects };
        from_stage.exit(&mut ctx, task)?;
    }

    let now = tx.now_ms();
    tasks::set_status(tx.conn(), task.id, &to_key, task.status_detail.as_deref(), now)?;
    tx.emit(
        team.id,
        Event::TaskStage { task: task.id, from: task.status.clone(), to: to_key.clone() },
    )?;

    // Re-load so enter/assign hooks observe the new stage.
    let task = tasks::require(tx.conn(), task.id)?;
    {
        let mut ctx = StageCtx { tx: &mut *tx, team, effects: &mut *effects };
        to_stage.enter(&mut ctx, &task)?;
        if let Some(assignee) = to_stage.assign(&mut ctx, &task) {
            let now = ctx.tx.now_ms();
            tasks::set_assignee(ctx.tx.conn(), task.id, Some(&assignee), now)?;
            ctx.tx.emit(
                team.id,
                Event::TaskAssigned { task: task.id, assignee: Some(assignee) },
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
