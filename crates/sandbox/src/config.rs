// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent resolved sandbox configuration.
//!
//! Built when a model session is created and handed to every layer. The
//! fingerprint detects drift: when it changes (repo registered, network
//! edit), the session manager rotates the agent's session.

use crate::denylist::DISALLOWED_TOOLS;
use dg_core::{AgentName, Layout, RepoConfig, Role, TaskId, TeamId};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub team: TeamId,
    pub agent: AgentName,
    pub role: Role,
    /// Absolute roots the agent may write under.
    pub write_allow: Vec<PathBuf>,
    /// Registered repo `.git` directories (writable for commit plumbing;
    /// the working trees themselves are *not* writable).
    pub git_dirs: Vec<PathBuf>,
    /// Allowed egress domains.
    pub network_allow: Vec<String>,
    /// Tools never advertised to the model.
    pub disallowed_tools: Vec<String>,
}

impl SandboxConfig {
    /// Resolve the config for an agent.
    ///
    /// Managers may write the whole team directory; engineers get their own
    /// agent directory (memory + task worktrees) plus the team shared
    /// folder. Reviewers are scoped like engineers.
    pub fn for_agent(
        layout: &Layout,
        team: TeamId,
        agent: &AgentName,
        role: Role,
        repos: &[RepoConfig],
        network_allow: Vec<String>,
        tasks: &[TaskId],
    ) -> Self {
        // The platform temp dir is writable at the OS-sandbox layer only;
        // the write-path guard stays scoped to delegate-owned directories.
        let write_allow = match role {
            Role::Manager => vec![layout.team_dir(team)],
            Role::Engineer | Role::Reviewer => {
                let mut paths = vec![layout.agent_dir(team, agent), layout.shared_dir(team)];
                for task in tasks {
                    paths.push(layout.task_dir(team, agent, *task));
                }
                paths
            }
        };

        let git_dirs: Vec<PathBuf> = repos.iter().map(|r| r.path.join(".git")).collect();

        Self {
            team,
            agent: agent.clone(),
            role,
            write_allow,
            git_dirs,
            network_allow,
            disallowed_tools: DISALLOWED_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Stable digest over everything a session bakes in at creation.
    /// A changed fingerprint forces a session rotation.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for path in &self.write_allow {
            hasher.update(path.display().to_string());
            hasher.update([0]);
        }
        for dir in &self.git_dirs {
            hasher.update(dir.display().to_string());
            hasher.update([0]);
        }
        for domain in &self.network_allow {
            hasher.update(domain);
            hasher.update([0]);
        }
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
