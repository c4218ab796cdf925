// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifier, stage keys, and the task record.

use crate::repo::RepoName;
use crate::team::TeamId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Unique identifier for a task: the monotonically increasing rowid.
///
/// Displays as `T0001`-style, which is also the form used in branch names
/// and worktree paths.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Parse a `T####` label back to an id.
    pub fn parse_label(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('T')?;
        digits.parse::<i64>().ok().map(Self)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{:04}", self.0)
    }
}

/// Key of a workflow stage.
///
/// Stage keys are workflow-defined; the well-known keys below are the ones
/// the default workflow and the merge worker use. `done`, `cancelled`, and
/// `rejected` are terminal everywhere; `merge_failed` is a branch stage a
/// task can be retried out of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageKey(String);

impl StageKey {
    pub const TODO: &'static str = "todo";
    pub const IN_PROGRESS: &'static str = "in_progress";
    pub const IN_REVIEW: &'static str = "in_review";
    pub const IN_APPROVAL: &'static str = "in_approval";
    pub const MERGING: &'static str = "merging";
    pub const DONE: &'static str = "done";
    pub const REJECTED: &'static str = "rejected";
    pub const MERGE_FAILED: &'static str = "merge_failed";
    pub const CANCELLED: &'static str = "cancelled";

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.0.as_str(), Self::DONE | Self::CANCELLED | Self::REJECTED)
    }
}

impl std::fmt::Display for StageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for StageKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StageKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Task priority, highest first in list views.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

crate::string_enum! {
    Priority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

/// Human approval state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

crate::string_enum! {
    ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// Why a dependency edit was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DepFreeze {
    /// All existing dependencies already resolved; the set is frozen.
    #[error("dependencies are frozen: existing dependencies already resolved")]
    Frozen,
    /// A worktree has been provisioned; the dependency set can no longer grow.
    #[error("dependencies are frozen: worktree already provisioned")]
    WorktreeExists,
    /// A task cannot depend on itself.
    #[error("task cannot depend on itself")]
    SelfDependency,
}

/// The unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub team: TeamId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    /// Current workflow stage key.
    pub status: StageKey,
    /// Agent currently responsible for moving the task forward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Directly responsible individual, usually the requester.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub depends_on: BTreeSet<TaskId>,
    /// Names of the registered repos this task works in.
    #[serde(default)]
    pub repos: BTreeSet<RepoName>,
    /// Branch name, `delegate/<team-name>/T####`.
    pub branch: String,
    /// Per-repo base sha captured at worktree creation. Immutable once set;
    /// empty until the worktree is provisioned.
    #[serde(default)]
    pub base_shas: BTreeMap<RepoName, String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Extra detail for the current status (e.g. merge failure cause).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    /// Workflow stamped at creation; never changes for the task's lifetime.
    pub workflow_name: String,
    pub workflow_version: u32,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
}

impl Task {
    /// Branch name for a task in a team, `delegate/<team-name>/T####`.
    pub fn branch_name(team_name: &str, id: TaskId) -> String {
        format!("delegate/{}/{}", team_name, id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the task's worktree has been provisioned.
    pub fn has_worktree(&self) -> bool {
        !self.base_shas.is_empty()
    }

    /// Check whether `dep` may be added to the dependency set.
    ///
    /// The freeze rule: once every existing dependency is terminal (or the
    /// worktree has been provisioned) the set can no longer grow. Removal is
    /// always permitted.
    pub fn check_add_dependency(
        &self,
        dep: TaskId,
        existing_all_terminal: bool,
    ) -> Result<(), DepFreeze> {
        if dep == self.id {
            return Err(DepFreeze::SelfDependency);
        }
        if self.has_worktree() {
            return Err(DepFreeze::WorktreeExists);
        }
        if !self.depends_on.is_empty() && existing_all_terminal {
            return Err(DepFreeze::Frozen);
        }
        Ok(())
    }

    /// Record `base_sha` for a repo. Returns false if one is already
    /// captured for this repo (base shas are immutable).
    pub fn capture_base_sha(&mut self, repo: RepoName, sha: String) -> bool {
        if self.base_shas.contains_key(&repo) {
            return false;
        }
        self.base_shas.insert(repo, sha);
        true
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            title: String = "test task",
            description: String = "",
            branch: String = "delegate/test/T0001",
            workflow_name: String = "default",
        }
        set {
            id: TaskId = TaskId(1),
            team: TeamId = TeamId(uuid::Uuid::nil()),
            priority: Priority = Priority::Normal,
            status: StageKey = StageKey::new(StageKey::TODO),
            depends_on: BTreeSet<TaskId> = BTreeSet::new(),
            repos: BTreeSet<RepoName> = BTreeSet::new(),
            base_shas: BTreeMap<RepoName, String> = BTreeMap::new(),
            attachments: Vec<String> = Vec::new(),
            approval_status: ApprovalStatus = ApprovalStatus::Pending,
            workflow_version: u32 = 1,
            created_at_ms: u64 = 1_000_000,
            updated_at_ms: u64 = 1_000_000,
        }
        option {
            assignee: String = None,
            dri: String = None,
            reviewer: String = None,
            rejection_reason: String = None,
            status_detail: String = None,
            completed_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
