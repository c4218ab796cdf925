// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{commit_file, git, harness, init_repo, Harness};
use crate::worktree;
use dg_core::{RepoConfig, StageKey};
use std::path::PathBuf;

/// Drive a task to `merging` with a provisioned worktree, returning the
/// worker, the repo root, and the agent worktree path.
async fn merge_ready(h: &mut Harness, repo: RepoConfig) -> (MergeWorker<dg_core::FakeClock>, dg_core::Task, PathBuf) {
    h.add_repo(&repo);
    let task = h.create_task("add endpoint", Some("alice"));

    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    worktree::setup(&h.ctx, task.id).await.unwrap();

    let task = h.task(task.id);
    let wt = h.ctx.layout.worktree_dir(
        task.team,
        &dg_core::AgentName::parse("alice").unwrap(),
        task.id,
        &repo.name,
    );

    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ReviewApproved).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ApprovalGranted).await.unwrap();
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::MERGING));

    let (_unused_tx, rx) = tokio::sync::mpsc::channel(1);
    let worker = MergeWorker::new(
        h.ctx.clone(),
        std::sync::Arc::clone(&h.engine),
        rx,
        Duration::from_secs(5),
        tokio_util::sync::CancellationToken::new(),
    );
    (worker, h.task(task.id), wt)
}

#[tokio::test]
async fn happy_path_fast_forwards_target() {
    let mut h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    let before = git(&repo_path, &["rev-parse", "main"]);

    let (worker, task, wt) = merge_ready(&mut h, RepoConfig::new("app", &repo_path)).await;
    commit_file(&wt, "health.rs", "fn health() {}\n", "add health endpoint");

    worker.process(task.id).await;

    let after = git(&repo_path, &["rev-parse", "main"]);
    assert_ne!(before, after, "main advanced");
    // Strict descendant of the previous tip.
    git(&repo_path, &["merge-base", "--is-ancestor", &before, &after]);
    // The merged tree contains the new file.
    let tree = git(&repo_path, &["ls-tree", "--name-only", "main"]);
    assert!(tree.contains("health.rs"));

    let done = h.task(task.id);
    assert_eq!(done.status, StageKey::new(StageKey::DONE));
}

#[tokio::test]
async fn conflicting_branch_falls_back_to_squash() {
    let mut h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));

    let (worker, task, wt) = merge_ready(&mut h, RepoConfig::new("app", &repo_path)).await;
    // Task branch edits README; main gets a conflicting edit after the
    // worktree was cut.
    commit_file(&wt, "README.md", "hello\nbranch line\n", "branch edit");
    commit_file(&repo_path, "README.md", "hello\nmain line\n", "mainline edit");

    worker.process(task.id).await;

    let done = h.task(task.id);
    assert_eq!(done.status, StageKey::new(StageKey::DONE), "{:?}", done.status_detail);
    // Branch side won the conflicting hunk.
    let contents = git(&repo_path, &["show", "main:README.md"]);
    assert!(contents.contains("branch line"), "{contents}");
}

#[tokio::test]
async fn premerge_failure_transitions_to_merge_failed() {
    let mut h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    let repo = RepoConfig::new("app", &repo_path).premerge_cmd("exit 3");
    let before = git(&repo_path, &["rev-parse", "main"]);

    let (worker, task, wt) = merge_ready(&mut h, repo).await;
    commit_file(&wt, "bad.rs", "broken\n", "bad change");

    worker.process(task.id).await;

    let failed = h.task(task.id);
    assert_eq!(failed.status, StageKey::new(StageKey::MERGE_FAILED));
    assert!(failed.status_detail.as_deref().unwrap_or("").contains("exited 3"));
    // No commits landed on main.
    assert_eq!(git(&repo_path, &["rev-parse", "main"]), before);
}

#[tokio::test]
async fn premerge_timeout_reports_timeout() {
    let mut h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    let repo = RepoConfig::new("app", &repo_path).premerge_cmd("sleep 9999");
    let before = git(&repo_path, &["rev-parse", "main"]);

    h.add_repo(&repo);
    let task = h.create_task("slow", Some("alice"));
    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    worktree::setup(&h.ctx, task.id).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ReviewApproved).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ApprovalGranted).await.unwrap();

    let (_tx, rx) = tokio::sync::mpsc::channel(1);
    let worker = MergeWorker::new(
        h.ctx.clone(),
        std::sync::Arc::clone(&h.engine),
        rx,
        Duration::from_millis(200),
        tokio_util::sync::CancellationToken::new(),
    );
    worker.process(task.id).await;

    let failed = h.task(task.id);
    assert_eq!(failed.status, StageKey::new(StageKey::MERGE_FAILED));
    assert!(failed.status_detail.as_deref().unwrap_or("").contains("timeout"));
    assert_eq!(git(&repo_path, &["rev-parse", "main"]), before);

    // The DRI heard about it, with the command named.
    let unread = h
        .ctx
        .store
        .read(|conn| dg_storage::messages::unread_for(conn, h.team.id, "pat"))
        .unwrap();
    assert!(unread.iter().any(|m| m.body.contains("sleep 9999")));
}

#[tokio::test]
async fn merge_skipped_when_not_in_merging() {
    let mut h = harness();
    let repo_path = init_repo(&h.home.path().join("srv/app"));
    h.add_repo(&RepoConfig::new("app", &repo_path));
    let task = h.create_task("idle", Some("alice"));

    let (_tx, rx) = tokio::sync::mpsc::channel(1);
    let worker = MergeWorker::new(
        h.ctx.clone(),
        std::sync::Arc::clone(&h.engine),
        rx,
        Duration::from_secs(5),
        tokio_util::sync::CancellationToken::new(),
    );
    worker.process(task.id).await;
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::TODO));
}

#[tokio::test]
async fn retry_gate_respects_dependencies() {
    let h = harness();
    let dep = h.create_task("dep", Some("alice"));
    let task = h.create_task("blocked", Some("alice"));
    h.ctx
        .store
        .with_tx(0, |tx| dg_storage::tasks::add_dependency(tx.conn(), task.id, dep.id, 0))
        .unwrap();

    assert!(!can_retry(&h.ctx, task.id).unwrap());
    h.engine.apply_event(dep.id, TaskEventKind::Cancelled).await.unwrap();
    assert!(can_retry(&h.ctx, task.id).unwrap());
}
