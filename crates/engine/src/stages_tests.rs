// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::harness;
use dg_core::RepoConfig;
use yare::parameterized;

#[test]
fn default_workflow_stage_order() {
    let workflow = default_workflow();
    let keys: Vec<String> =
        workflow.stage_keys().iter().map(|k| k.as_str().to_string()).collect();
    assert_eq!(
        keys,
        vec![
            "todo",
            "in_progress",
            "in_review",
            "in_approval",
            "merging",
            "done",
            "rejected",
            "merge_failed",
            "cancelled"
        ]
    );
    assert_eq!(workflow.initial_stage().map(|k| k.to_string()), Some("todo".to_string()));
}

#[parameterized(
    start = { StageKey::TODO, TaskEventKind::WorkStarted, Some(StageKey::IN_PROGRESS) },
    complete = { StageKey::IN_PROGRESS, TaskEventKind::WorkCompleted, Some(StageKey::IN_REVIEW) },
    approve_review = { StageKey::IN_REVIEW, TaskEventKind::ReviewApproved, Some(StageKey::IN_APPROVAL) },
    request_changes = { StageKey::IN_REVIEW, TaskEventKind::ChangesRequested, Some(StageKey::IN_PROGRESS) },
    grant = { StageKey::IN_APPROVAL, TaskEventKind::ApprovalGranted, Some(StageKey::MERGING) },
    deny = { StageKey::IN_APPROVAL, TaskEventKind::ApprovalDenied, Some(StageKey::REJECTED) },
    merged = { StageKey::MERGING, TaskEventKind::MergeSucceeded, Some(StageKey::DONE) },
    merge_fail = { StageKey::MERGING, TaskEventKind::MergeFailed, Some(StageKey::MERGE_FAILED) },
    retry = { StageKey::MERGE_FAILED, TaskEventKind::RetryRequested, Some(StageKey::MERGING) },
    cancel_todo = { StageKey::TODO, TaskEventKind::Cancelled, Some(StageKey::CANCELLED) },
    no_skip = { StageKey::TODO, TaskEventKind::MergeSucceeded, None },
    no_double_grant = { StageKey::MERGING, TaskEventKind::ApprovalGranted, None },
)]
fn default_transitions(from: &str, on: TaskEventKind, to: Option<&str>) {
    let workflow = default_workflow();
    let next = workflow.next_stage(&StageKey::new(from), on).map(|k| k.as_str().to_string());
    assert_eq!(next.as_deref(), to);
}

#[tokio::test]
async fn auto_approval_repo_skips_human_gate() {
    let mut h = harness();
    h.add_repo(&RepoConfig::new("app", "/nonexistent").approval(dg_core::ApprovalPolicy::Auto));
    let task = h.create_task("work", Some("alice"));

    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ReviewApproved).await.unwrap();

    // in_approval.enter deferred an approval_granted raise.
    h.pump_raises().await;
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::MERGING));
}

#[tokio::test]
async fn human_approval_repo_waits() {
    let mut h = harness();
    h.add_repo(&RepoConfig::new("app", "/nonexistent"));
    let task = h.create_task("work", Some("alice"));

    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ReviewApproved).await.unwrap();

    h.pump_raises().await;
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::IN_APPROVAL));
}

#[tokio::test]
async fn merge_failed_enter_notifies_dri_with_detail() {
    let h = harness();
    let task = h.create_task("work", Some("alice"));
    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ReviewApproved).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ApprovalGranted).await.unwrap();

    // Simulate the worker recording a cause before the transition.
    h.ctx
        .store
        .with_tx(0, |tx| {
            dg_storage::tasks::set_status(
                tx.conn(),
                task.id,
                &StageKey::new(StageKey::MERGING),
                Some("pre-merge command \"sleep 9999\" timeout after 5s"),
                0,
            )
        })
        .unwrap();
    h.engine.apply_event(task.id, TaskEventKind::MergeFailed).await.unwrap();

    let failed = h.task(task.id);
    assert_eq!(failed.status, StageKey::new(StageKey::MERGE_FAILED));
    assert!(failed.status_detail.as_deref().unwrap_or("").contains("timeout"));

    let unread = h
        .ctx
        .store
        .read(|conn| dg_storage::messages::unread_for(conn, h.team.id, "pat"))
        .unwrap();
    assert!(unread.iter().any(|m| m.body.contains("failed to merge")));
}
