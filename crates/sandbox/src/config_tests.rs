// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dg_core::{test_support, RepoConfig, TaskId, TeamId};

fn layout() -> Layout {
    Layout::new("/srv/delegate")
}

#[test]
fn manager_gets_whole_team_dir() {
    let layout = layout();
    let team = TeamId::new();
    let config = SandboxConfig::for_agent(
        &layout,
        team,
        &test_support::name("boss"),
        Role::Manager,
        &[],
        vec![],
        &[],
    );
    assert_eq!(config.write_allow, vec![layout.team_dir(team)]);
}

#[test]
fn engineer_scoped_to_own_corner() {
    let layout = layout();
    let team = TeamId::new();
    let alice = test_support::name("alice");
    let config = SandboxConfig::for_agent(
        &layout,
        team,
        &alice,
        Role::Engineer,
        &[],
        vec![],
        &[TaskId(3)],
    );
    assert!(config.write_allow.contains(&layout.agent_dir(team, &alice)));
    assert!(config.write_allow.contains(&layout.shared_dir(team)));
    assert!(config.write_allow.contains(&layout.task_dir(team, &alice, TaskId(3))));
    assert!(!config.write_allow.contains(&layout.team_dir(team)));
}

#[test]
fn git_dirs_derived_from_repos() {
    let layout = layout();
    let repo = RepoConfig::new("app", "/srv/app");
    let config = SandboxConfig::for_agent(
        &layout,
        TeamId::new(),
        &test_support::name("alice"),
        Role::Engineer,
        std::slice::from_ref(&repo),
        vec![],
        &[],
    );
    assert_eq!(config.git_dirs, vec![std::path::PathBuf::from("/srv/app/.git")]);
}

#[test]
fn fingerprint_changes_with_repos_and_network() {
    let layout = layout();
    let team = TeamId::new();
    let alice = test_support::name("alice");
    let base = SandboxConfig::for_agent(&layout, team, &alice, Role::Engineer, &[], vec![], &[]);

    let repo = RepoConfig::new("app", "/srv/app");
    let with_repo = SandboxConfig::for_agent(
        &layout,
        team,
        &alice,
        Role::Engineer,
        std::slice::from_ref(&repo),
        vec![],
        &[],
    );
    assert_ne!(base.fingerprint(), with_repo.fingerprint());

    let with_net = SandboxConfig::for_agent(
        &layout,
        team,
        &alice,
        Role::Engineer,
        &[],
        vec!["crates.io".into()],
        &[],
    );
    assert_ne!(base.fingerprint(), with_net.fingerprint());
}

#[test]
fn fingerprint_is_stable() {
    let layout = layout();
    let team = TeamId::new();
    let alice = test_support::name("alice");
    let a = SandboxConfig::for_agent(&layout, team, &alice, Role::Engineer, &[], vec![], &[]);
    let b = SandboxConfig::for_agent(&layout, team, &alice, Role::Engineer, &[], vec![], &[]);
    assert_eq!(a.fingerprint(), b.fingerprint());
}
