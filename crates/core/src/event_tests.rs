// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::task::TaskId;

#[test]
fn events_serialize_with_type_tag() {
    let event = Event::TaskCreated { task: TaskId(1), title: "add endpoint".into(), dri: None };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "task:created");
    assert_eq!(json["task"], 1);
}

#[test]
fn kind_matches_serde_tag() {
    let event = Event::MergeQueued { task: TaskId(3) };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], event.kind());
}

#[test]
fn events_roundtrip() {
    let event = Event::TaskStage {
        task: TaskId(2),
        from: StageKey::new(StageKey::IN_REVIEW),
        to: StageKey::new(StageKey::IN_APPROVAL),
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(event, back);
}

#[test]
fn envelope_flattens_event() {
    let envelope = EventEnvelope {
        global_seq: 10,
        team_seq: 4,
        team: TeamId::new(),
        at_ms: 1_000,
        event: Event::TaskCancelled { task: TaskId(5) },
    };
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["type"], "task:cancelled");
    assert_eq!(json["global_seq"], 10);
    assert_eq!(json["team_seq"], 4);
}

#[test]
fn sender_human_detection() {
    assert!(Sender::Human("pat".into()).is_human());
    assert!(!Sender::Agent("alice".into()).is_human());
    assert!(!Sender::Daemon.is_human());
}

#[test]
fn merge_failure_summaries() {
    let conflicts = MergeFailureReason::Conflicts { files: vec!["src/a.rs".into()] };
    assert!(conflicts.summary().contains("src/a.rs"));

    let timeout = MergeFailureReason::TestTimeout { command: "sleep 9999".into(), timeout_secs: 5 };
    assert!(timeout.summary().contains("timeout"));
}
