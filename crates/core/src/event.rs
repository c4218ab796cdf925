// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the Delegate system.
//!
//! Every state change a client might care about is written as an [`Event`]
//! inside the same transaction as the write that caused it. Envelopes carry
//! the per-team and global sequence numbers assigned by the store.

use crate::id::SessionId;
use crate::message::{MessageId, MessageKind};
use crate::review::{ReviewDecision, ReviewId};
use crate::task::{StageKey, TaskId};
use crate::team::TeamId;
use crate::usage::TurnUsage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Originator of a message or action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "name", rename_all = "snake_case")]
pub enum Sender {
    /// A registered human member. Human messages form exclusive turn batches.
    Human(String),
    /// An agent in the same team.
    Agent(String),
    /// The daemon itself (nudges, merge notifications, system events).
    Daemon,
}

impl Sender {
    pub fn is_human(&self) -> bool {
        matches!(self, Sender::Human(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Sender::Human(n) | Sender::Agent(n) => n,
            Sender::Daemon => "daemon",
        }
    }
}

/// Why a merge attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum MergeFailureReason {
    /// Rebase and the squash-reapply fallback both left conflicts.
    Conflicts { files: Vec<String> },
    /// The repo's pre-merge command exited non-zero.
    TestFailed { command: String, exit_code: i32, output: String },
    /// The pre-merge command exceeded its timeout.
    TestTimeout { command: String, timeout_secs: u64 },
    /// A git invocation itself failed (fetch, fast-forward).
    GitError { detail: String },
}

impl MergeFailureReason {
    /// One-line summary stored as the task's status detail.
    pub fn summary(&self) -> String {
        match self {
            MergeFailureReason::Conflicts { files } => {
                format!("conflicts in {} file(s): {}", files.len(), files.join(", "))
            }
            MergeFailureReason::TestFailed { command, exit_code, .. } => {
                format!("pre-merge command {:?} exited {}", command, exit_code)
            }
            MergeFailureReason::TestTimeout { command, timeout_secs } => {
                format!("pre-merge command {:?} timeout after {}s", command, timeout_secs)
            }
            MergeFailureReason::GitError { detail } => format!("git error: {}", detail),
        }
    }
}

/// Why a session was rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationReason {
    ContextPressure,
    SandboxConfigChanged,
    SessionError,
}

crate::string_enum! {
    RotationReason {
        ContextPressure => "context_pressure",
        SandboxConfigChanged => "sandbox_config_changed",
        SessionError => "session_error",
    }
}

/// Events appended to the team log.
///
/// Serializes with `{"type": "task:created", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- team --
    #[serde(rename = "team:created")]
    TeamCreated { team: TeamId, name: String },

    #[serde(rename = "team:removed")]
    TeamRemoved { team: TeamId },

    #[serde(rename = "agent:added")]
    AgentAdded { team: TeamId, name: String, role: String },

    // -- task --
    #[serde(rename = "task:created")]
    TaskCreated {
        task: TaskId,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dri: Option<String>,
    },

    #[serde(rename = "task:stage")]
    TaskStage { task: TaskId, from: StageKey, to: StageKey },

    #[serde(rename = "task:assigned")]
    TaskAssigned {
        task: TaskId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assignee: Option<String>,
    },

    #[serde(rename = "task:updated")]
    TaskUpdated { task: TaskId },

    #[serde(rename = "task:approved")]
    TaskApproved { task: TaskId, by: String },

    #[serde(rename = "task:rejected")]
    TaskRejected { task: TaskId, by: String, reason: String },

    #[serde(rename = "task:cancelled")]
    TaskCancelled { task: TaskId },

    #[serde(rename = "task:dep_added")]
    DepAdded { task: TaskId, dep: TaskId },

    #[serde(rename = "task:dep_removed")]
    DepRemoved { task: TaskId, dep: TaskId },

    // -- messages --
    #[serde(rename = "message:sent")]
    MessageSent {
        message: MessageId,
        sender: Sender,
        recipient: String,
        kind: MessageKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<TaskId>,
    },

    // -- reviews --
    #[serde(rename = "review:created")]
    ReviewCreated { review: ReviewId, task: TaskId, attempt: u32, reviewer: String },

    #[serde(rename = "review:decided")]
    ReviewDecided { review: ReviewId, task: TaskId, decision: ReviewDecision },

    // -- worktrees & merges --
    #[serde(rename = "worktree:created")]
    WorktreeCreated { task: TaskId, repo: String, path: PathBuf, branch: String, base_sha: String },

    #[serde(rename = "worktree:removed")]
    WorktreeRemoved { task: TaskId },

    #[serde(rename = "merge:queued")]
    MergeQueued { task: TaskId },

    #[serde(rename = "merge:started")]
    MergeStarted { task: TaskId },

    #[serde(rename = "merge:succeeded")]
    MergeSucceeded { task: TaskId, repo: String, tip: String },

    #[serde(rename = "merge:failed")]
    MergeFailed { task: TaskId, reason: MergeFailureReason },

    // -- turns --
    #[serde(rename = "turn:started")]
    TurnStarted { agent: String, session: SessionId, batch: Vec<MessageId> },

    /// Incremental model-reply text. `index` is monotonic within a turn.
    #[serde(rename = "turn:delta")]
    TurnDelta { agent: String, index: u32, text: String },

    #[serde(rename = "turn:completed")]
    TurnCompleted { agent: String, session: SessionId, usage: TurnUsage },

    #[serde(rename = "turn:failed")]
    TurnFailed { agent: String, error: String },

    /// Upstream rate limit; the triggering messages are re-queued unread.
    #[serde(rename = "turn:rate_limited")]
    RateLimited { agent: String, retry_in_ms: u64 },

    // -- sessions & sandbox --
    /// The named session was retired; the replacement is created lazily on
    /// the agent's next turn.
    #[serde(rename = "session:rotated")]
    SessionRotated { agent: String, old: SessionId, reason: RotationReason },

    #[serde(rename = "sandbox:denial")]
    SandboxDenial { agent: String, layer: String, operation: String },

    #[serde(rename = "network:updated")]
    NetworkUpdated { domains: Vec<String> },

    // -- daemon --
    #[serde(rename = "daemon:started")]
    DaemonStarted { version: String },
}

impl Event {
    /// The serde tag string, used for SSE kind filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TeamCreated { .. } => "team:created",
            Event::TeamRemoved { .. } => "team:removed",
            Event::AgentAdded { .. } => "agent:added",
            Event::TaskCreated { .. } => "task:created",
            Event::TaskStage { .. } => "task:stage",
            Event::TaskAssigned { .. } => "task:assigned",
            Event::TaskUpdated { .. } => "task:updated",
            Event::TaskApproved { .. } => "task:approved",
            Event::TaskRejected { .. } => "task:rejected",
            Event::TaskCancelled { .. } => "task:cancelled",
            Event::DepAdded { .. } => "task:dep_added",
            Event::DepRemoved { .. } => "task:dep_removed",
            Event::MessageSent { .. } => "message:sent",
            Event::ReviewCreated { .. } => "review:created",
            Event::ReviewDecided { .. } => "review:decided",
            Event::WorktreeCreated { .. } => "worktree:created",
            Event::WorktreeRemoved { .. } => "worktree:removed",
            Event::MergeQueued { .. } => "merge:queued",
            Event::MergeStarted { .. } => "merge:started",
            Event::MergeSucceeded { .. } => "merge:succeeded",
            Event::MergeFailed { .. } => "merge:failed",
            Event::TurnStarted { .. } => "turn:started",
            Event::TurnDelta { .. } => "turn:delta",
            Event::TurnCompleted { .. } => "turn:completed",
            Event::TurnFailed { .. } => "turn:failed",
            Event::RateLimited { .. } => "turn:rate_limited",
            Event::SessionRotated { .. } => "session:rotated",
            Event::SandboxDenial { .. } => "sandbox:denial",
            Event::NetworkUpdated { .. } => "network:updated",
            Event::DaemonStarted { .. } => "daemon:started",
        }
    }
}

/// Alias used where only the tag string matters.
pub type EventKind = &'static str;

/// A persisted event with its assigned sequence numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Globally monotonic sequence across all teams.
    pub global_seq: i64,
    /// Monotonic sequence within the team.
    pub team_seq: i64,
    pub team: TeamId,
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: Event,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
