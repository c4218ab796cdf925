// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for tests in this crate and downstream crates
//! (enabled with the `test-support` feature).

#![allow(clippy::unwrap_used)]

use crate::agent::{Agent, AgentName, Role};
use crate::team::{Team, TeamId};

/// A team named `acme` with a fixed timestamp.
pub fn team() -> Team {
    Team::new("acme", 1_000_000)
}

/// An agent on `team` with the given name and role.
pub fn agent(team: TeamId, name: &str, role: Role) -> Agent {
    Agent::new(team, AgentName::parse(name).unwrap(), role, 1_000_000)
}

/// Parse an [`AgentName`] that is known-valid in test code.
pub fn name(s: &str) -> AgentName {
    AgentName::parse(s).unwrap()
}
