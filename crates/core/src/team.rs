// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team identity and configuration.
//!
//! A team is the isolation boundary: it owns a working directory, a roster
//! of agents, a set of registered repos, and a charter. Names are display
//! labels; identity is the UUID.

use crate::agent::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub Uuid);

impl TeamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named isolation boundary with its own agents, repos, and charter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Freeform markdown instructions shared by every agent in the team.
    #[serde(default)]
    pub charter: String,
    /// Model selector per role; missing roles fall back to `default_model`.
    #[serde(default)]
    pub models: HashMap<Role, String>,
    #[serde(default = "default_model")]
    pub default_model: String,
    pub created_at_ms: u64,
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

impl Team {
    pub fn new(name: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            id: TeamId::new(),
            name: name.into(),
            charter: String::new(),
            models: HashMap::new(),
            default_model: default_model(),
            created_at_ms,
        }
    }

    /// Model selector for a role, falling back to the team default.
    pub fn model_for(&self, role: Role) -> &str {
        self.models.get(&role).map(String::as_str).unwrap_or(&self.default_model)
    }
}

#[cfg(test)]
#[path = "team_tests.rs"]
mod tests;
