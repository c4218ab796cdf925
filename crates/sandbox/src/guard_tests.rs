// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::SandboxConfig;
use dg_core::{test_support, Layout, Role, TaskId, TeamId};

fn engineer_guard(root: &std::path::Path) -> (WriteGuard, Layout, TeamId) {
    let layout = Layout::new(root);
    let team = TeamId::new();
    let alice = test_support::name("alice");
    let config = SandboxConfig::for_agent(
        &layout,
        team,
        &alice,
        Role::Engineer,
        &[],
        vec![],
        &[TaskId(1)],
    );
    (WriteGuard::new(config), layout, team)
}

#[test]
fn engineer_may_write_own_agent_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (guard, layout, team) = engineer_guard(dir.path());
    let target = layout.agent_memory_dir(team, &test_support::name("alice")).join("notes.md");
    assert!(guard.check_write(&target).is_ok());
}

#[test]
fn engineer_may_write_shared_dir_and_task_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (guard, layout, team) = engineer_guard(dir.path());
    assert!(guard.check_write(&layout.shared_dir(team).join("plan.md")).is_ok());
    let task_file =
        layout.task_dir(team, &test_support::name("alice"), TaskId(1)).join("app/src/main.rs");
    assert!(guard.check_write(&task_file).is_ok());
}

#[test]
fn engineer_denied_outside_allowlist() {
    let dir = tempfile::tempdir().unwrap();
    let (guard, _, _) = engineer_guard(dir.path());
    let err = guard.check_write(std::path::Path::new("/etc/passwd")).unwrap_err();
    assert_eq!(err.layer, Layer::WriteGuard);
}

#[test]
fn engineer_denied_other_agents_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (guard, layout, team) = engineer_guard(dir.path());
    let target = layout.agent_dir(team, &test_support::name("bob")).join("memory/notes.md");
    assert!(guard.check_write(&target).is_err());
}

#[test]
fn dotdot_cannot_escape_allowlist() {
    let dir = tempfile::tempdir().unwrap();
    let (guard, layout, team) = engineer_guard(dir.path());
    let sneaky = layout
        .agent_dir(team, &test_support::name("alice"))
        .join("../../../../../../etc/passwd");
    assert!(guard.check_write(&sneaky).is_err());
}

#[test]
fn manager_may_write_whole_team_dir() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    let team = TeamId::new();
    let boss = test_support::name("boss");
    let config =
        SandboxConfig::for_agent(&layout, team, &boss, Role::Manager, &[], vec![], &[]);
    let guard = WriteGuard::new(config);

    let other_agent = layout.agent_dir(team, &test_support::name("alice")).join("memory/x");
    assert!(guard.check_write(&other_agent).is_ok());
}

#[test]
fn manager_denied_protected_dir() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    let team = TeamId::new();
    let boss = test_support::name("boss");
    let config =
        SandboxConfig::for_agent(&layout, team, &boss, Role::Manager, &[], vec![], &[]);
    let guard = WriteGuard::new(config);

    assert!(guard.check_write(&layout.db_path()).is_err());
    assert!(guard.check_write(&layout.network_path()).is_err());
}

#[test]
fn repo_git_dir_is_writable_but_worktree_is_not() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    let team = TeamId::new();
    let alice = test_support::name("alice");
    let repo = dg_core::RepoConfig::new("app", dir.path().join("srv/app"));
    let config = SandboxConfig::for_agent(
        &layout,
        team,
        &alice,
        Role::Engineer,
        std::slice::from_ref(&repo),
        vec![],
        &[],
    );
    let guard = WriteGuard::new(config);

    assert!(guard.check_write(&repo.path.join(".git/objects/ab/cdef")).is_ok());
    assert!(guard.check_write(&repo.path.join("src/main.rs")).is_err());
}

#[test]
fn bash_denial_reports_layer() {
    let dir = tempfile::tempdir().unwrap();
    let (guard, _, _) = engineer_guard(dir.path());
    let err = guard.check_bash("git push origin main").unwrap_err();
    assert_eq!(err.layer, Layer::BashDeny);
    assert!(guard.check_bash("cargo build").is_ok());
}

#[test]
fn disallowed_tool_reports_layer() {
    let dir = tempfile::tempdir().unwrap();
    let (guard, _, _) = engineer_guard(dir.path());
    let err = guard.check_tool("git_push").unwrap_err();
    assert_eq!(err.layer, Layer::ToolList);
    assert!(guard.check_tool("mailbox_send").is_ok());
}
