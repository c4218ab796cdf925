// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow vocabulary shared between the engine and storage.
//!
//! Stage *behavior* (the hook trait and registry) lives in the engine; the
//! core only carries the identity of a workflow and the event kinds that
//! drive transitions.

use serde::{Deserialize, Serialize};

/// Identity of a workflow definition.
///
/// Tasks stamp `(name, version)` at creation and resolve stages against
/// that exact pair forever; live edits register a new version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub name: String,
    pub version: u32,
}

impl WorkflowRef {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self { name: name.into(), version }
    }
}

impl std::fmt::Display for WorkflowRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@v{}", self.name, self.version)
    }
}

/// Task-scoped occurrences a stage transition can key on.
///
/// Transitions are keyed by `(from_stage, TaskEventKind)`; an event with no
/// matching transition is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    /// Assignee picked the task up.
    WorkStarted,
    /// Assignee reported the implementation finished.
    WorkCompleted,
    /// A review concluded with approval.
    ReviewApproved,
    /// A review concluded requesting changes.
    ChangesRequested,
    /// The human (or auto policy) granted merge approval.
    ApprovalGranted,
    /// The human rejected the task.
    ApprovalDenied,
    /// The merge worker fast-forwarded the target.
    MergeSucceeded,
    /// The merge worker gave up (conflicts, tests, timeout).
    MergeFailed,
    /// Explicit user retry of a failed merge.
    RetryRequested,
    /// The task was cancelled.
    Cancelled,
}

crate::string_enum! {
    TaskEventKind {
        WorkStarted => "work_started",
        WorkCompleted => "work_completed",
        ReviewApproved => "review_approved",
        ChangesRequested => "changes_requested",
        ApprovalGranted => "approval_granted",
        ApprovalDenied => "approval_denied",
        MergeSucceeded => "merge_succeeded",
        MergeFailed => "merge_failed",
        RetryRequested => "retry_requested",
        Cancelled => "cancelled",
    }
}
