// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human identities.
//!
//! Members are registered under `members/<name>.yaml`. The scheduler uses
//! the registry to decide whether a message sender is human, which forces
//! exclusive turn batches.

use serde::{Deserialize, Serialize};

/// A human identity known to the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), display_name: None, email: None }
    }
}
