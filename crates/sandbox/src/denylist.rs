// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forbidden substrings for agent bash commands, and the git verbs that
//! are never advertised to the model.
//!
//! The daemon is the sole actor for branch topology; these lists are the
//! second and third layers backing that up.

/// Git verbs reserved for the daemon.
pub const DENIED_GIT_VERBS: &[&str] = &[
    "rebase",
    "merge",
    "push",
    "pull",
    "fetch",
    "checkout",
    "switch",
    "worktree",
    "remote",
    "branch",
    "filter-branch",
];

/// Tool names never included in a session's advertised tool set.
pub const DISALLOWED_TOOLS: &[&str] = &[
    "git_rebase",
    "git_merge",
    "git_push",
    "git_pull",
    "git_fetch",
    "git_checkout",
    "git_branch",
    "git_worktree",
    "git_remote",
];

/// Non-git substrings that fail any bash command outright.
const BASH_DENY: &[&str] = &[
    // DB console and destructive SQL against the protected store
    "sqlite3",
    "DROP TABLE",
    "DELETE FROM",
    "TRUNCATE TABLE",
    // repo metadata destruction
    "rm -rf .git",
    "rm -rf ./.git",
    // history rewriting that slips past the verb scan
    "reflog expire",
    "reset --hard",
];

/// Scan a bash command string. Returns the first matching forbidden
/// substring, or `None` when the command passes.
///
/// Deliberately a plain substring scan: over-blocking is acceptable here
/// (the OS sandbox is the layer that must be airtight), under-blocking is
/// not. `git -C /x push` is caught by normalizing runs of whitespace.
pub fn scan_bash(command: &str) -> Option<String> {
    for needle in BASH_DENY {
        if command.contains(needle) {
            return Some((*needle).to_string());
        }
    }
    let words: Vec<&str> = command.split_whitespace().collect();
    let mentions_git = words.iter().any(|w| *w == "git" || w.ends_with("/git"));
    if mentions_git {
        for verb in DENIED_GIT_VERBS {
            if words.contains(verb) {
                return Some(format!("git {verb}"));
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "denylist_tests.rs"]
mod tests;
