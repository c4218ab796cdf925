// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn message_kind_parse_roundtrips_display() {
    for kind in [MessageKind::Chat, MessageKind::Event, MessageKind::ToolResult] {
        assert_eq!(MessageKind::parse(&kind.to_string()), Some(kind));
    }
    assert_eq!(MessageKind::parse("gossip"), None);
}

#[test]
fn message_serde_omits_empty_task() {
    let message = Message {
        id: MessageId(1),
        team: TeamId::new(),
        sender: Sender::Human("pat".into()),
        recipient: "manager".into(),
        kind: MessageKind::Chat,
        body: "hello".into(),
        task: None,
        at_ms: 0,
        read: false,
    };
    let json = serde_json::to_value(&message).unwrap();
    assert!(json.get("task").is_none());
    assert_eq!(json["sender"]["by"], "human");
}
