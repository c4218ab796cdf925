// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::harness;
use dg_core::{StageKey, TaskEventKind};

#[tokio::test]
async fn transition_moves_stage_and_emits_event() {
    let mut h = harness();
    let task = h.create_task("work", Some("alice"));

    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();

    let task = h.task(task.id);
    assert_eq!(task.status, StageKey::new(StageKey::IN_PROGRESS));
    let events = h.drain_events();
    assert!(events.iter().any(|e| e.event.kind() == "task:stage"));
}

#[tokio::test]
async fn unmatched_event_is_ignored() {
    let h = harness();
    let task = h.create_task("work", Some("alice"));

    // merge_succeeded has no transition from todo.
    h.engine.apply_event(task.id, TaskEventKind::MergeSucceeded).await.unwrap();
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::TODO));
}

#[tokio::test]
async fn full_happy_path_reaches_done() {
    let mut h = harness();
    let task = h.create_task("work", Some("alice"));

    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::IN_REVIEW));
    // in_review enter picked a review-capable, non-assignee reviewer.
    assert_eq!(h.task(task.id).reviewer.as_deref(), Some("boss"));

    h.engine.apply_event(task.id, TaskEventKind::ReviewApproved).await.unwrap();
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::IN_APPROVAL));

    h.engine.apply_event(task.id, TaskEventKind::ApprovalGranted).await.unwrap();
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::MERGING));
    // merging enter queued the task for the merge worker.
    assert_eq!(h.merge_rx.try_recv().ok(), Some(task.id));

    h.engine.apply_event(task.id, TaskEventKind::MergeSucceeded).await.unwrap();
    let done = h.task(task.id);
    assert_eq!(done.status, StageKey::new(StageKey::DONE));
    assert!(done.completed_at_ms.is_some());
}

#[tokio::test]
async fn changes_requested_loops_back_to_in_progress() {
    let h = harness();
    let task = h.create_task("work", Some("alice"));
    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ChangesRequested).await.unwrap();
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::IN_PROGRESS));
}

#[tokio::test]
async fn rejection_is_terminal() {
    let h = harness();
    let task = h.create_task("work", Some("alice"));
    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ReviewApproved).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ApprovalDenied).await.unwrap();

    let task = h.task(task.id);
    assert_eq!(task.status, StageKey::new(StageKey::REJECTED));
    assert!(task.is_terminal());
}

#[tokio::test]
async fn registry_resolves_exact_version() {
    let registry = WorkflowRegistry::new();
    registry.register(crate::stages::default_workflow());
    assert!(registry.get("default", 1).is_some());
    assert!(registry.get("default", 2).is_none());
    assert!(registry.get("other", 1).is_none());
}

#[tokio::test]
async fn registry_latest_prefers_highest_version() {
    let registry = WorkflowRegistry::new();
    registry.register(Workflow::new("default", 1));
    registry.register(Workflow::new("default", 3));
    registry.register(Workflow::new("default", 2));
    assert_eq!(registry.latest("default").map(|w| w.version), Some(3));
}

#[tokio::test]
async fn task_resolves_stamped_version_not_latest() {
    let mut h = harness();
    let task = h.create_task("work", Some("alice"));

    // Register a v2 with NO transitions: if resolution used latest, the
    // event below would be ignored.
    h.engine.registry().register(Workflow::new("default", 2));

    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    assert_eq!(h.task(task.id).status, StageKey::new(StageKey::IN_PROGRESS));
    let _ = h.drain_events();
}

#[tokio::test]
async fn merging_enter_notifies_dri_on_approval_wait() {
    let mut h = harness();
    let task = h.create_task("work", Some("alice"));
    h.engine.apply_event(task.id, TaskEventKind::WorkStarted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::WorkCompleted).await.unwrap();
    h.engine.apply_event(task.id, TaskEventKind::ReviewApproved).await.unwrap();

    // No auto-approval repos and DRI set: the DRI got a mailbox message.
    let unread = h
        .ctx
        .store
        .read(|conn| dg_storage::messages::unread_for(conn, h.team.id, "pat"))
        .unwrap();
    assert!(unread.iter().any(|m| m.body.contains("awaits your approval")));
    let _ = h.drain_events();
}
