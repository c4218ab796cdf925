// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable review records.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

/// Unique identifier for a review: the monotonically increasing rowid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ReviewId(pub i64);

impl ReviewId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Outcome of a review attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
}

crate::string_enum! {
    ReviewDecision {
        Approved => "approved",
        ChangesRequested => "changes_requested",
    }
}

/// An inline comment anchored to a file and line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub file: String,
    pub line: u32,
    pub body: String,
}

/// Record of one review attempt on a task. Immutable once written; a task
/// accumulates one record per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub task: TaskId,
    pub attempt: u32,
    pub reviewer: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub comments: Vec<ReviewComment>,
    pub decision: ReviewDecision,
    pub at_ms: u64,
}
