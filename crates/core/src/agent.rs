// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent roster entries.
//!
//! An agent is a long-lived participant scoped to a team, backed by at most
//! one model session at a time. Identity within a team is the agent name;
//! cross-references always travel as `(TeamId, name)` pairs, never pointers.

use crate::team::TeamId;
use serde::{Deserialize, Serialize};

/// Role of an agent within its team.
///
/// The role decides the write-path allow-list (managers get the whole team
/// directory, engineers only their own corner) and which agents are eligible
/// to review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    Engineer,
    Reviewer,
}

crate::string_enum! {
    Role {
        Manager => "manager",
        Engineer => "engineer",
        Reviewer => "reviewer",
    }
}

impl Role {
    /// Whether this role may author reviews.
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Manager | Role::Reviewer)
    }
}

/// Validated agent name: non-empty, lowercase alphanumeric plus `-` and `_`,
/// safe to embed in paths and branch names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(String);

impl AgentName {
    pub fn parse(s: &str) -> Result<Self, InvalidAgentName> {
        if s.is_empty() || s.len() > 64 {
            return Err(InvalidAgentName(s.to_string()));
        }
        let ok = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !ok {
            return Err(InvalidAgentName(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for AgentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid agent name: {0:?} (lowercase alphanumeric, '-', '_', max 64 chars)")]
pub struct InvalidAgentName(pub String);

/// A member of a team's roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub team: TeamId,
    pub name: AgentName,
    pub role: Role,
    /// Model selector override; empty means "use the team's role default".
    #[serde(default)]
    pub model: String,
    pub created_at_ms: u64,
}

impl Agent {
    pub fn new(team: TeamId, name: AgentName, role: Role, created_at_ms: u64) -> Self {
        Self { team, name, role, model: String::new(), created_at_ms }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
