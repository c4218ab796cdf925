// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn task_id_displays_padded() {
    assert_eq!(TaskId(1).to_string(), "T0001");
    assert_eq!(TaskId(42).to_string(), "T0042");
    assert_eq!(TaskId(12345).to_string(), "T12345");
}

#[test]
fn task_id_parses_label() {
    assert_eq!(TaskId::parse_label("T0007"), Some(TaskId(7)));
    assert_eq!(TaskId::parse_label("7"), None);
    assert_eq!(TaskId::parse_label("Txx"), None);
}

#[parameterized(
    done = { StageKey::DONE, true },
    cancelled = { StageKey::CANCELLED, true },
    rejected = { StageKey::REJECTED, true },
    merge_failed = { StageKey::MERGE_FAILED, false },
    merging = { StageKey::MERGING, false },
    todo = { StageKey::TODO, false },
)]
fn stage_terminality(key: &str, terminal: bool) {
    assert_eq!(StageKey::new(key).is_terminal(), terminal);
}

#[test]
fn branch_name_format() {
    assert_eq!(Task::branch_name("acme", TaskId(1)), "delegate/acme/T0001");
}

#[test]
fn add_dependency_allowed_before_resolution() {
    let mut task = Task::builder().build();
    task.depends_on.insert(TaskId(9));
    // existing dep not yet terminal -> may still add
    assert!(task.check_add_dependency(TaskId(10), false).is_ok());
}

#[test]
fn add_dependency_frozen_once_existing_resolved() {
    let mut task = Task::builder().build();
    task.depends_on.insert(TaskId(9));
    assert_eq!(task.check_add_dependency(TaskId(10), true), Err(DepFreeze::Frozen));
}

#[test]
fn add_dependency_refused_after_worktree() {
    let mut task = Task::builder().build();
    task.capture_base_sha(RepoName::from("app"), "abc0000".to_string());
    assert_eq!(task.check_add_dependency(TaskId(10), false), Err(DepFreeze::WorktreeExists));
}

#[test]
fn add_dependency_refuses_self() {
    let task = Task::builder().build();
    assert_eq!(task.check_add_dependency(task.id, false), Err(DepFreeze::SelfDependency));
}

#[test]
fn base_sha_is_immutable_once_captured() {
    let mut task = Task::builder().build();
    assert!(task.capture_base_sha(RepoName::from("app"), "abc0000".to_string()));
    assert!(!task.capture_base_sha(RepoName::from("app"), "def1111".to_string()));
    assert_eq!(task.base_shas.get(&RepoName::from("app")).map(String::as_str), Some("abc0000"));
}

#[test]
fn empty_deps_task_may_gain_first_dep_before_worktree() {
    let task = Task::builder().build();
    assert!(task.check_add_dependency(TaskId(2), true).is_ok());
}
