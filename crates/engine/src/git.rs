// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git plumbing. The daemon is the sole actor for branch topology; every
//! invocation here runs with a scrubbed environment and a timeout.

use crate::error::EngineError;
use crate::subprocess::{run_with_timeout, GIT_TIMEOUT};
use std::path::Path;
use tokio::process::Command;

fn git(repo: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

async fn run(cmd: Command, label: &'static str) -> Result<std::process::Output, EngineError> {
    run_with_timeout(cmd, GIT_TIMEOUT, label).await.map_err(|e| EngineError::Git(e.to_string()))
}

async fn run_ok(cmd: Command, label: &'static str) -> Result<String, EngineError> {
    let output = run(cmd, label).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::Git(format!("{label}: {}", stderr.trim())));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Resolve a ref to a sha.
pub async fn rev_parse(repo: &Path, reference: &str) -> Result<String, EngineError> {
    let mut cmd = git(repo);
    cmd.args(["rev-parse", reference]);
    run_ok(cmd, "git rev-parse").await
}

/// Create a worktree on a new branch at `start_point`.
pub async fn worktree_add(
    repo: &Path,
    path: &Path,
    branch: &str,
    start_point: &str,
) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut cmd = git(repo);
    cmd.args(["worktree", "add", "-b", branch]).arg(path).arg(start_point);
    run_ok(cmd, "git worktree add").await.map(|_| ())
}

/// Create a detached worktree at an existing ref (merge scratch area).
pub async fn worktree_add_detached(
    repo: &Path,
    path: &Path,
    reference: &str,
) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut cmd = git(repo);
    cmd.args(["worktree", "add", "--detach"]).arg(path).arg(reference);
    run_ok(cmd, "git worktree add").await.map(|_| ())
}

/// Remove a worktree and optionally its branch. Best-effort.
pub async fn worktree_remove(repo: &Path, path: &Path, branch: Option<&str>) {
    let mut cmd = git(repo);
    cmd.args(["worktree", "remove", "--force"]).arg(path);
    if let Err(e) = run_ok(cmd, "git worktree remove").await {
        tracing::warn!(path = %path.display(), error = %e, "worktree remove failed (best-effort)");
    }
    if let Some(branch) = branch {
        let mut cmd = git(repo);
        cmd.args(["branch", "-D", branch]);
        if let Err(e) = run_ok(cmd, "git branch delete").await {
            tracing::debug!(branch, error = %e, "branch delete failed (best-effort)");
        }
    }
    if path.exists() {
        let _ = tokio::fs::remove_dir_all(path).await;
    }
}

/// Rebase HEAD of `worktree` onto `onto`. Returns `Ok(false)` and aborts
/// the rebase when conflicts stop it.
pub async fn rebase_onto(worktree: &Path, onto: &str) -> Result<bool, EngineError> {
    let mut cmd = git(worktree);
    cmd.args(["rebase", onto]);
    let output = run(cmd, "git rebase").await?;
    if output.status.success() {
        return Ok(true);
    }
    let mut abort = git(worktree);
    abort.args(["rebase", "--abort"]);
    let _ = run(abort, "git rebase abort").await;
    Ok(false)
}

/// Squash-merge `branch` into HEAD favoring the branch side for files it
/// modified. Returns the conflicting files when the merge cannot complete.
pub async fn squash_merge_theirs(
    worktree: &Path,
    branch: &str,
    message: &str,
) -> Result<Result<(), Vec<String>>, EngineError> {
    let mut cmd = git(worktree);
    cmd.args(["merge", "--squash", "-X", "theirs", branch]);
    let output = run(cmd, "git merge --squash").await?;
    if !output.status.success() {
        let files = conflict_files(worktree).await.unwrap_or_default();
        // A squash merge leaves no MERGE_HEAD; reset --merge unwinds it.
        let mut reset = git(worktree);
        reset.args(["reset", "--merge"]);
        let _ = run(reset, "git reset").await;
        return Ok(Err(files));
    }
    let mut commit = git(worktree);
    commit.args(["commit", "--no-verify", "-m", message]);
    let output = run(commit, "git commit").await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::Git(format!("squash commit: {}", stderr.trim())));
    }
    Ok(Ok(()))
}

/// Unmerged paths in a worktree.
pub async fn conflict_files(worktree: &Path) -> Result<Vec<String>, EngineError> {
    let mut cmd = git(worktree);
    cmd.args(["diff", "--name-only", "--diff-filter=U"]);
    let stdout = run_ok(cmd, "git diff").await?;
    Ok(stdout.lines().map(str::to_string).collect())
}

/// True when `ancestor` is an ancestor of `descendant`.
pub async fn is_ancestor(repo: &Path, ancestor: &str, descendant: &str) -> Result<bool, EngineError> {
    let mut cmd = git(repo);
    cmd.args(["merge-base", "--is-ancestor", ancestor, descendant]);
    let output = run(cmd, "git merge-base").await?;
    Ok(output.status.success())
}

/// Fast-forward `branch` to `tip`. Refuses when the move is not a
/// fast-forward; never creates merge commits.
pub async fn fast_forward(repo: &Path, branch: &str, tip: &str) -> Result<(), EngineError> {
    let current = rev_parse(repo, branch).await?;
    if !is_ancestor(repo, &current, tip).await? {
        return Err(EngineError::Git(format!(
            "refusing non-fast-forward of {branch} ({current} -> {tip})"
        )));
    }
    let refname = format!("refs/heads/{branch}");
    let mut cmd = git(repo);
    cmd.args(["update-ref", refname.as_str(), tip, current.as_str()]);
    run_ok(cmd, "git update-ref").await.map(|_| ())
}

/// Unified diff of a worktree against a base sha.
pub async fn diff_against(worktree: &Path, base: &str) -> Result<String, EngineError> {
    let mut cmd = git(worktree);
    cmd.args(["diff", base]);
    run_ok(cmd, "git diff").await
}

/// Stage everything and commit. Returns `None` when the tree matches HEAD
/// (nothing to commit), making repeated identical writes idempotent.
pub async fn commit_all(worktree: &Path, message: &str) -> Result<Option<String>, EngineError> {
    let mut add = git(worktree);
    add.args(["add", "-A"]);
    run_ok(add, "git add").await?;

    let mut check = git(worktree);
    check.args(["diff", "--cached", "--quiet"]);
    let staged = run(check, "git diff --cached").await?;
    if staged.status.success() {
        return Ok(None);
    }

    let mut commit = git(worktree);
    commit.args(["commit", "--no-verify", "-m", message]);
    run_ok(commit, "git commit").await?;
    rev_parse(worktree, "HEAD").await.map(Some)
}

/// `git fetch` for repos with a remote; a no-op (without error) when the
/// repo has none.
pub async fn fetch_if_remote(repo: &Path) -> Result<(), EngineError> {
    let mut list = git(repo);
    list.arg("remote");
    let remotes = run_ok(list, "git remote").await?;
    if remotes.is_empty() {
        return Ok(());
    }
    let mut cmd = git(repo);
    cmd.arg("fetch");
    run_ok(cmd, "git fetch").await.map(|_| ())
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
