// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{commit_file, git as run_git, init_repo};

#[tokio::test]
async fn rev_parse_resolves_branch() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let sha = rev_parse(&repo, "main").await.unwrap();
    assert_eq!(sha.len(), 40);
}

#[tokio::test]
async fn worktree_add_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let wt = dir.path().join("wt/task");

    worktree_add(&repo, &wt, "delegate/acme/T0001", "main").await.unwrap();
    assert!(wt.join("README.md").exists());

    worktree_remove(&repo, &wt, Some("delegate/acme/T0001")).await;
    assert!(!wt.exists());
    // Branch is gone too.
    let err = rev_parse(&repo, "delegate/acme/T0001").await;
    assert!(err.is_err());
}

#[tokio::test]
async fn rebase_clean_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let wt = dir.path().join("wt");
    worktree_add(&repo, &wt, "feature", "main").await.unwrap();
    commit_file(&wt, "feature.txt", "feature\n", "feature work");
    commit_file(&repo, "other.txt", "other\n", "mainline work");

    let main_tip = rev_parse(&repo, "main").await.unwrap();
    assert!(rebase_onto(&wt, &main_tip).await.unwrap());
    assert!(is_ancestor(&repo, &main_tip, &rev_parse(&wt, "HEAD").await.unwrap()).await.unwrap());
}

#[tokio::test]
async fn rebase_conflict_aborts_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let wt = dir.path().join("wt");
    worktree_add(&repo, &wt, "feature", "main").await.unwrap();
    commit_file(&wt, "README.md", "feature line\n", "feature edit");
    commit_file(&repo, "README.md", "main line\n", "main edit");

    let main_tip = rev_parse(&repo, "main").await.unwrap();
    let before = rev_parse(&wt, "HEAD").await.unwrap();
    assert!(!rebase_onto(&wt, &main_tip).await.unwrap());
    // Aborted: HEAD unchanged, no rebase in progress.
    assert_eq!(rev_parse(&wt, "HEAD").await.unwrap(), before);
}

#[tokio::test]
async fn fast_forward_moves_branch() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let wt = dir.path().join("wt");
    worktree_add(&repo, &wt, "feature", "main").await.unwrap();
    commit_file(&wt, "f.txt", "x\n", "work");

    let tip = rev_parse(&wt, "HEAD").await.unwrap();
    fast_forward(&repo, "main", &tip).await.unwrap();
    assert_eq!(rev_parse(&repo, "main").await.unwrap(), tip);
}

#[tokio::test]
async fn fast_forward_refuses_divergence() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let wt = dir.path().join("wt");
    worktree_add(&repo, &wt, "feature", "main").await.unwrap();
    commit_file(&wt, "f.txt", "x\n", "feature work");
    commit_file(&repo, "g.txt", "y\n", "diverging main work");

    let tip = rev_parse(&wt, "HEAD").await.unwrap();
    let err = fast_forward(&repo, "main", &tip).await.unwrap_err();
    assert!(err.to_string().contains("non-fast-forward"));
}

#[tokio::test]
async fn squash_merge_keeps_branch_side() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let wt = dir.path().join("wt");
    worktree_add(&repo, &wt, "feature", "main").await.unwrap();
    commit_file(&wt, "README.md", "hello\nfeature line\n", "feature edit");
    commit_file(&repo, "README.md", "hello\nmain line\n", "main edit");

    // Scratch worktree at main tip, squash the feature branch in.
    let scratch = dir.path().join("scratch");
    let main_tip = rev_parse(&repo, "main").await.unwrap();
    worktree_add_detached(&repo, &scratch, &main_tip).await.unwrap();
    let result = squash_merge_theirs(&scratch, "feature", "T0001 (squashed)").await.unwrap();
    assert!(result.is_ok());

    let contents = std::fs::read_to_string(scratch.join("README.md")).unwrap();
    assert!(contents.contains("feature line"), "branch side wins: {contents}");
}

#[tokio::test]
async fn diff_against_base_reports_changes() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let base = rev_parse(&repo, "main").await.unwrap();
    commit_file(&repo, "new.txt", "content\n", "add file");
    let diff = diff_against(&repo, &base).await.unwrap();
    assert!(diff.contains("new.txt"));
    assert!(diff.contains("+content"));
}

#[tokio::test]
async fn fetch_without_remote_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    fetch_if_remote(&repo).await.unwrap();
}

#[tokio::test]
async fn conflict_files_lists_unmerged() {
    let dir = tempfile::tempdir().unwrap();
    let repo = init_repo(&dir.path().join("repo"));
    let wt = dir.path().join("wt");
    worktree_add(&repo, &wt, "feature", "main").await.unwrap();
    commit_file(&wt, "README.md", "feature\n", "feature edit");
    commit_file(&repo, "README.md", "main\n", "main edit");

    // Force a conflicted merge state without -X theirs.
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(&wt)
        .args(["merge", "main"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let files = conflict_files(&wt).await.unwrap();
    assert_eq!(files, vec!["README.md".to_string()]);
    run_git(&wt, &["merge", "--abort"]);
}
