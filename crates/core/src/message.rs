// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Addressed communication between humans, agents, and the daemon.

use crate::event::Sender;
use crate::task::TaskId;
use crate::team::TeamId;
use serde::{Deserialize, Serialize};

/// Unique identifier for a message: the monotonically increasing rowid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Kind of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Conversational text between participants.
    Chat,
    /// A system event surfaced into a mailbox (stage changes, failures).
    Event,
    /// The persisted result of a tool call with observable side effects.
    ToolResult,
}

crate::string_enum! {
    MessageKind {
        Chat => "chat",
        Event => "event",
        ToolResult => "tool_result",
    }
}

/// A routed message. Every message is both delivered to the recipient's
/// mailbox and appended to the team event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub team: TeamId,
    pub sender: Sender,
    /// Recipient agent name (or member name for outbound notifications).
    pub recipient: String,
    pub kind: MessageKind,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskId>,
    pub at_ms: u64,
    #[serde(default)]
    pub read: bool,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
