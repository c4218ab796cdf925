// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::EngineError;
use crate::test_helpers::{harness, init_repo};
use dg_core::{RepoConfig, TaskEventKind};
use dg_storage::tasks as task_repo;

#[tokio::test]
async fn setup_captures_base_sha_and_checks_out_branch() {
    let mut h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    h.add_repo(&RepoConfig::new("app", &repo_path));
    let task = h.create_task("work", Some("alice"));

    setup(&h.ctx, task.id).await.unwrap();

    let task = h.task(task.id);
    assert!(task.has_worktree());
    let sha = task.base_shas.get(&dg_core::RepoName::from("app")).unwrap();
    assert_eq!(sha.len(), 40);

    let wt = h.ctx.layout.worktree_dir(
        task.team,
        &dg_core::AgentName::parse("alice").unwrap(),
        task.id,
        &dg_core::RepoName::from("app"),
    );
    assert!(wt.join("README.md").exists());
    // Checked out on the task branch.
    let branch = crate::test_helpers::git(&wt, &["rev-parse", "--abbrev-ref", "HEAD"]);
    assert_eq!(branch, task.branch);

    let events = h.drain_events();
    assert!(events.iter().any(|e| e.event.kind() == "worktree:created"));
}

#[tokio::test]
async fn setup_refuses_while_dependency_open() {
    let h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    h.add_repo(&RepoConfig::new("app", &repo_path));

    let dep = h.create_task("dep", Some("alice"));
    let task = h.create_task("work", Some("alice"));
    h.ctx
        .store
        .with_tx(0, |tx| task_repo::add_dependency(tx.conn(), task.id, dep.id, 0))
        .unwrap();

    let err = setup(&h.ctx, task.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Gated(_)));
    assert!(!h.task(task.id).has_worktree());
}

#[tokio::test]
async fn setup_proceeds_once_dependency_terminal() {
    let h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    h.add_repo(&RepoConfig::new("app", &repo_path));

    let dep = h.create_task("dep", Some("alice"));
    let task = h.create_task("work", Some("alice"));
    h.ctx
        .store
        .with_tx(0, |tx| task_repo::add_dependency(tx.conn(), task.id, dep.id, 0))
        .unwrap();

    h.engine.apply_event(dep.id, TaskEventKind::Cancelled).await.unwrap();
    setup(&h.ctx, task.id).await.unwrap();
    assert!(h.task(task.id).has_worktree());
}

#[tokio::test]
async fn setup_is_idempotent_once_provisioned() {
    let h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    h.add_repo(&RepoConfig::new("app", &repo_path));
    let task = h.create_task("work", Some("alice"));

    setup(&h.ctx, task.id).await.unwrap();
    let first = h.task(task.id).base_shas;
    setup(&h.ctx, task.id).await.unwrap();
    assert_eq!(h.task(task.id).base_shas, first, "base_sha is immutable");
}

#[tokio::test]
async fn remove_tears_down_worktree_and_branch() {
    let mut h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    h.add_repo(&RepoConfig::new("app", &repo_path));
    let task = h.create_task("work", Some("alice"));
    setup(&h.ctx, task.id).await.unwrap();

    remove_worktrees(&h.ctx, task.id).await;

    let task = h.task(task.id);
    assert!(!task.has_worktree());
    let wt = h.ctx.layout.worktree_dir(
        task.team,
        &dg_core::AgentName::parse("alice").unwrap(),
        task.id,
        &dg_core::RepoName::from("app"),
    );
    assert!(!wt.exists());
    let events = h.drain_events();
    assert!(events.iter().any(|e| e.event.kind() == "worktree:removed"));
}
