// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    push = { "git push origin main" },
    rebase = { "git rebase main" },
    merge = { "git merge feature" },
    fetch = { "git fetch --all" },
    checkout = { "git checkout -b x" },
    switch_cmd = { "git switch main" },
    branch = { "git branch -D victim" },
    worktree = { "git worktree remove ../x" },
    remote = { "git remote add origin x" },
    filter = { "git filter-branch --all" },
    with_c_flag = { "git -C /srv/app push" },
    abs_git = { "/usr/bin/git push" },
    chained = { "ls && git push" },
)]
fn denied_git_invocations(cmd: &str) {
    assert!(scan_bash(cmd).is_some(), "{cmd:?} should be denied");
}

#[parameterized(
    reset_hard = { "git reset --hard HEAD~3" },
    reflog = { "git reflog expire --all" },
    sqlite = { "sqlite3 delegate.db .dump" },
    drop = { "echo 'DROP TABLE tasks' | psql" },
    delete_sql = { "run 'DELETE FROM events'" },
    rm_git = { "rm -rf .git" },
)]
fn denied_destructive_commands(cmd: &str) {
    assert!(scan_bash(cmd).is_some(), "{cmd:?} should be denied");
}

#[parameterized(
    status = { "git status" },
    add_commit = { "git add -A && git commit -m 'wip'" },
    diff = { "git diff HEAD" },
    log = { "git log --oneline" },
    cargo = { "cargo test --workspace" },
    plain = { "ls -la" },
    soft_reset = { "git reset --soft HEAD~1" },
)]
fn allowed_commands(cmd: &str) {
    assert_eq!(scan_bash(cmd), None, "{cmd:?} should pass");
}

#[test]
fn every_denied_git_verb_has_a_disallowed_tool_or_scan_hit() {
    // Defense in depth: each denied verb is caught by the bash scan, and the
    // common ones are also absent from the advertised tool set.
    for verb in DENIED_GIT_VERBS {
        let cmd = format!("git {verb}");
        assert!(scan_bash(&cmd).is_some(), "verb {verb} not denied");
    }
}
