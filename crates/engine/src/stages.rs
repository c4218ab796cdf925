// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The default workflow.
//!
//! `todo → in_progress → in_review → in_approval → merging → done`, with
//! branch targets `rejected`, `merge_failed`, `cancelled`.

use crate::error::EngineError;
use crate::workflow::{Stage, StageCtx, Workflow};
use dg_core::task::ApprovalStatus;
use dg_core::{ApprovalPolicy, StageKey, Task, TaskEventKind};
use std::sync::Arc;

/// Resolve a built-in stage implementation by key.
///
/// Stage *behavior* is code; registered workflow definitions are data that
/// reference these by key and rewire the transition graph.
pub fn builtin_stage(key: &str) -> Option<Arc<dyn Stage>> {
    match key {
        StageKey::TODO => Some(Arc::new(Todo)),
        StageKey::IN_PROGRESS => Some(Arc::new(InProgress)),
        StageKey::IN_REVIEW => Some(Arc::new(InReview)),
        StageKey::IN_APPROVAL => Some(Arc::new(InApproval)),
        StageKey::MERGING => Some(Arc::new(Merging)),
        StageKey::DONE => Some(Arc::new(Done)),
        StageKey::REJECTED => Some(Arc::new(Rejected)),
        StageKey::MERGE_FAILED => Some(Arc::new(MergeFailed)),
        StageKey::CANCELLED => Some(Arc::new(Cancelled)),
        _ => None,
    }
}

/// Assemble a workflow from a declarative definition over the built-in
/// stage vocabulary.
pub fn workflow_from_spec(
    name: &str,
    version: u32,
    stage_keys: &[String],
    transitions: &[(String, TaskEventKind, String)],
) -> Result<Workflow, String> {
    let mut workflow = Workflow::new(name, version);
    for key in stage_keys {
        let stage = builtin_stage(key).ok_or_else(|| format!("unknown stage {key:?}"))?;
        workflow = workflow.stage(stage);
    }
    for (from, on, to) in transitions {
        workflow = workflow.transition(from, *on, to);
    }
    Ok(workflow)
}

/// Build the default workflow at version 1.
pub fn default_workflow() -> Workflow {
    use TaskEventKind as K;
    Workflow::new("default", 1)
        .stage(Arc::new(Todo))
        .stage(Arc::new(InProgress))
        .stage(Arc::new(InReview))
        .stage(Arc::new(InApproval))
        .stage(Arc::new(Merging))
        .stage(Arc::new(Done))
        .stage(Arc::new(Rejected))
        .stage(Arc::new(MergeFailed))
        .stage(Arc::new(Cancelled))
        .transition(StageKey::TODO, K::WorkStarted, StageKey::IN_PROGRESS)
        .transition(StageKey::TODO, K::Cancelled, StageKey::CANCELLED)
        .transition(StageKey::IN_PROGRESS, K::WorkCompleted, StageKey::IN_REVIEW)
        .transition(StageKey::IN_PROGRESS, K::Cancelled, StageKey::CANCELLED)
        .transition(StageKey::IN_REVIEW, K::ReviewApproved, StageKey::IN_APPROVAL)
        .transition(StageKey::IN_REVIEW, K::ChangesRequested, StageKey::IN_PROGRESS)
        .transition(StageKey::IN_REVIEW, K::Cancelled, StageKey::CANCELLED)
        .transition(StageKey::IN_APPROVAL, K::ApprovalGranted, StageKey::MERGING)
        .transition(StageKey::IN_APPROVAL, K::ApprovalDenied, StageKey::REJECTED)
        .transition(StageKey::IN_APPROVAL, K::Cancelled, StageKey::CANCELLED)
        .transition(StageKey::MERGING, K::MergeSucceeded, StageKey::DONE)
        .transition(StageKey::MERGING, K::MergeFailed, StageKey::MERGE_FAILED)
        .transition(StageKey::MERGE_FAILED, K::RetryRequested, StageKey::MERGING)
        .transition(StageKey::MERGE_FAILED, K::Cancelled, StageKey::CANCELLED)
}

struct Todo;

impl Stage for Todo {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::TODO)
    }

    fn label(&self) -> &str {
        "To do"
    }

    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        if let Some(assignee) = &task.assignee {
            ctx.send_message(
                assignee,
                &format!("{} assigned to you: {}", task.id, task.title),
                Some(task.id),
            )?;
        }
        Ok(())
    }
}

struct InProgress;

impl Stage for InProgress {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::IN_PROGRESS)
    }

    fn label(&self) -> &str {
        "In progress"
    }

    /// First non-todo stage: provision the worktrees. A dependency gate is
    /// not an error here; the scheduler retries gated tasks every tick.
    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        match ctx.setup_worktree(task) {
            Ok(()) => Ok(()),
            Err(EngineError::Gated(gate)) => {
                tracing::debug!(task = %gate.task, open = gate.open, "worktree gated on deps");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}

struct InReview;

impl Stage for InReview {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::IN_REVIEW)
    }

    fn label(&self) -> &str {
        "In review"
    }

    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        let reviewer = match pick_reviewer(ctx, task) {
            Some(r) => r,
            // Nobody review-capable: fall back to the DRI so the task
            // does not stall silently.
            None => match &task.dri {
                Some(dri) => dri.clone(),
                None => return Ok(()),
            },
        };
        ctx.create_review(task, &reviewer)?;
        Ok(())
    }
}

/// Prefer the task's stamped reviewer, else any review-capable agent that
/// is not the assignee. The task's *assignee* is untouched: the engineer
/// still owns the follow-up work.
fn pick_reviewer(ctx: &mut StageCtx<'_, '_>, task: &Task) -> Option<String> {
    if let Some(reviewer) = &task.reviewer {
        return Some(reviewer.clone());
    }
    let agents = dg_storage::teams::list_agents(ctx.conn(), ctx.team().id).ok()?;
    agents
        .iter()
        .find(|a| a.role.can_review() && Some(a.name.as_str()) != task.assignee.as_deref())
        .map(|a| a.name.as_str().to_string())
}

struct InApproval;

impl Stage for InApproval {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::IN_APPROVAL)
    }

    fn label(&self) -> &str {
        "Awaiting approval"
    }

    /// Auto-approval repos skip the human gate: raise `approval_granted`
    /// right after this transition commits.
    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        let repos = dg_storage::teams::list_repos(ctx.conn(), ctx.team().id)?;
        let in_set: Vec<_> = repos.iter().filter(|r| task.repos.contains(&r.name)).collect();
        let all_auto =
            !in_set.is_empty() && in_set.iter().all(|r| r.approval == ApprovalPolicy::Auto);
        if all_auto || task.approval_status == ApprovalStatus::Approved {
            ctx.raise(task, TaskEventKind::ApprovalGranted);
        } else if let Some(dri) = &task.dri {
            ctx.send_message(
                dri,
                &format!("{} awaits your approval: {}", task.id, task.title),
                Some(task.id),
            )?;
        }
        Ok(())
    }
}

struct Merging;

impl Stage for Merging {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::MERGING)
    }

    fn label(&self) -> &str {
        "Merging"
    }

    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        ctx.enqueue_merge(task)
    }
}

struct Done;

impl Stage for Done {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::DONE)
    }

    fn label(&self) -> &str {
        "Done"
    }

    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        ctx.remove_worktree(task);
        if let Some(dri) = &task.dri {
            ctx.send_message(dri, &format!("{} merged: {}", task.id, task.title), Some(task.id))?;
        }
        Ok(())
    }
}

struct Rejected;

impl Stage for Rejected {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::REJECTED)
    }

    fn label(&self) -> &str {
        "Rejected"
    }

    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        ctx.remove_worktree(task);
        if let Some(assignee) = &task.assignee {
            let reason = task.rejection_reason.as_deref().unwrap_or("no reason given");
            ctx.send_message(
                assignee,
                &format!("{} rejected: {}", task.id, reason),
                Some(task.id),
            )?;
        }
        Ok(())
    }
}

struct MergeFailed;

impl Stage for MergeFailed {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::MERGE_FAILED)
    }

    fn label(&self) -> &str {
        "Merge failed"
    }

    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        if let Some(dri) = &task.dri {
            let detail = task.status_detail.as_deref().unwrap_or("unknown cause");
            ctx.send_message(
                dri,
                &format!("{} failed to merge: {}", task.id, detail),
                Some(task.id),
            )?;
        }
        Ok(())
    }
}

struct Cancelled;

impl Stage for Cancelled {
    fn key(&self) -> StageKey {
        StageKey::new(StageKey::CANCELLED)
    }

    fn label(&self) -> &str {
        "Cancelled"
    }

    fn enter(&self, ctx: &mut StageCtx<'_, '_>, task: &Task) -> Result<(), EngineError> {
        ctx.remove_worktree(task);
        Ok(())
    }
}

#[cfg(test)]
#[path = "stages_tests.rs"]
mod tests;
