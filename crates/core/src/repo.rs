// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registered repository configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Display name of a registered repo, unique within a team.
///
/// Used as the directory name for worktrees and the symlink under
/// `teams/<uuid>/repos/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(pub String);

impl RepoName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Merge approval policy for a repo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// A human must approve before the merge worker picks the task up.
    #[default]
    Human,
    /// Reviewer approval is sufficient; no human gate.
    Auto,
}

crate::string_enum! {
    ApprovalPolicy {
        Human => "human",
        Auto => "auto",
    }
}

/// A git repository registered with a team.
///
/// The repo root lives outside the team directory and is referenced by a
/// symlink; the daemon never writes the repo working tree itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub name: RepoName,
    pub path: PathBuf,
    #[serde(default = "default_branch")]
    pub target_branch: String,
    /// Command run inside the merge worktree before fast-forwarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premerge_cmd: Option<String>,
    #[serde(default)]
    pub approval: ApprovalPolicy,
}

fn default_branch() -> String {
    "main".to_string()
}

impl RepoConfig {
    pub fn new(name: impl Into<RepoName>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            target_branch: default_branch(),
            premerge_cmd: None,
            approval: ApprovalPolicy::default(),
        }
    }

    pub fn target_branch(mut self, branch: impl Into<String>) -> Self {
        self.target_branch = branch.into();
        self
    }

    pub fn approval(mut self, approval: ApprovalPolicy) -> Self {
        self.approval = approval;
        self
    }

    pub fn premerge_cmd(mut self, command: impl Into<String>) -> Self {
        self.premerge_cmd = Some(command.into());
        self
    }
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
