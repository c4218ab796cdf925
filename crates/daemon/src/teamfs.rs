// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team directory scaffolding.
//!
//! The daemon owns the on-disk shape of a team: agent directories, repo
//! symlinks, the shared folder, and `team_ids.json` (the name → uuid cache
//! clients bootstrap from).

use dg_core::{AgentName, Layout, RepoConfig, Team, TeamId};
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Create the directory tree for a new team.
pub fn scaffold_team(layout: &Layout, team: &Team) -> io::Result<()> {
    std::fs::create_dir_all(layout.agents_dir(team.id))?;
    std::fs::create_dir_all(layout.repos_dir(team.id))?;
    std::fs::create_dir_all(layout.shared_dir(team.id))?;
    std::fs::create_dir_all(layout.workflows_dir(team.id))?;
    let env_path = layout.settings_env_path(team.id);
    if !env_path.exists() {
        std::fs::write(&env_path, "# sourced into every sandboxed session\n")?;
    }
    Ok(())
}

/// Create an agent's home (memory + tasks).
pub fn scaffold_agent(layout: &Layout, team: TeamId, agent: &AgentName) -> io::Result<()> {
    std::fs::create_dir_all(layout.agent_memory_dir(team, agent))?;
    std::fs::create_dir_all(layout.agent_dir(team, agent).join("tasks"))?;
    Ok(())
}

/// Symlink a registered repo under `teams/<uuid>/repos/<name>`.
pub fn link_repo(layout: &Layout, team: TeamId, repo: &RepoConfig) -> io::Result<()> {
    let link = layout.repos_dir(team).join(repo.name.as_str());
    if link.exists() || link.symlink_metadata().is_ok() {
        std::fs::remove_file(&link)?;
    }
    symlink(&repo.path, &link)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "repo symlinks require unix"))
}

/// Recursive teardown of a team's working directory.
pub fn remove_team_dir(layout: &Layout, team: TeamId) -> io::Result<()> {
    let dir = layout.team_dir(team);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    Ok(())
}

/// Rewrite `protected/team_ids.json` from the current team list.
pub fn write_team_ids(layout: &Layout, teams: &[Team]) -> io::Result<()> {
    let map: HashMap<&str, String> =
        teams.iter().map(|t| (t.name.as_str(), t.id.to_string())).collect();
    std::fs::create_dir_all(layout.protected_dir())?;
    std::fs::write(
        layout.team_ids_path(),
        serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string()),
    )
}

#[cfg(test)]
#[path = "teamfs_tests.rs"]
mod tests;
