// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout under the installation home.
//!
//! ```text
//! protected/   daemon.lock, daemon.pid, daemon.port, delegate.db,
//!              backups/, network.yaml, team_ids.json, logs/
//! teams/<uuid>/
//!   agents/<name>/      memory/, tasks/T####/<repo>/   (worktrees)
//!   repos/              symlinks to registered repos
//!   shared/             team-wide freeform files
//!   workflows/          registered workflow definitions
//!   settings.env
//! members/<name>.yaml   human identities
//! ```
//!
//! The protected directory is written only by the daemon; agents own their
//! memory directory and assigned worktrees, nothing else.

use crate::agent::AgentName;
use crate::repo::RepoName;
use crate::task::TaskId;
use crate::team::TeamId;
use std::path::{Path, PathBuf};

/// Environment variable overriding the installation home.
pub const HOME_ENV: &str = "DELEGATE_HOME";

/// Resolver for every path the daemon touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
}

impl Layout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Resolve from `DELEGATE_HOME`, falling back to `~/.delegate`.
    pub fn discover() -> Self {
        if let Ok(home) = std::env::var(HOME_ENV) {
            if !home.is_empty() {
                return Self::new(home);
            }
        }
        let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::new(Path::new(&base).join(".delegate"))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    // -- protected directory (daemon-only) --

    pub fn protected_dir(&self) -> PathBuf {
        self.home.join("protected")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.protected_dir().join("daemon.lock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.protected_dir().join("daemon.pid")
    }

    pub fn port_path(&self) -> PathBuf {
        self.protected_dir().join("daemon.port")
    }

    pub fn db_path(&self) -> PathBuf {
        self.protected_dir().join("delegate.db")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.protected_dir().join("backups")
    }

    pub fn network_path(&self) -> PathBuf {
        self.protected_dir().join("network.yaml")
    }

    pub fn team_ids_path(&self) -> PathBuf {
        self.protected_dir().join("team_ids.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.protected_dir().join("logs")
    }

    // -- teams --

    pub fn teams_dir(&self) -> PathBuf {
        self.home.join("teams")
    }

    pub fn team_dir(&self, team: TeamId) -> PathBuf {
        self.teams_dir().join(team.to_string())
    }

    pub fn agents_dir(&self, team: TeamId) -> PathBuf {
        self.team_dir(team).join("agents")
    }

    pub fn agent_dir(&self, team: TeamId, agent: &AgentName) -> PathBuf {
        self.agents_dir(team).join(agent.as_str())
    }

    pub fn agent_memory_dir(&self, team: TeamId, agent: &AgentName) -> PathBuf {
        self.agent_dir(team, agent).join("memory")
    }

    pub fn task_dir(&self, team: TeamId, agent: &AgentName, task: TaskId) -> PathBuf {
        self.agent_dir(team, agent).join("tasks").join(task.to_string())
    }

    /// Worktree checkout for one repo of a task.
    pub fn worktree_dir(
        &self,
        team: TeamId,
        agent: &AgentName,
        task: TaskId,
        repo: &RepoName,
    ) -> PathBuf {
        self.task_dir(team, agent, task).join(repo.as_str())
    }

    pub fn repos_dir(&self, team: TeamId) -> PathBuf {
        self.team_dir(team).join("repos")
    }

    pub fn shared_dir(&self, team: TeamId) -> PathBuf {
        self.team_dir(team).join("shared")
    }

    pub fn workflows_dir(&self, team: TeamId) -> PathBuf {
        self.team_dir(team).join("workflows")
    }

    pub fn settings_env_path(&self, team: TeamId) -> PathBuf {
        self.team_dir(team).join("settings.env")
    }

    /// Scratch worktree the merge worker rebases in.
    pub fn merge_dir(&self, team: TeamId, task: TaskId, repo: &RepoName) -> PathBuf {
        self.team_dir(team).join("merge").join(task.to_string()).join(repo.as_str())
    }

    // -- members --

    pub fn members_dir(&self) -> PathBuf {
        self.home.join("members")
    }

    pub fn member_path(&self, name: &str) -> PathBuf {
        self.members_dir().join(format!("{}.yaml", name))
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
