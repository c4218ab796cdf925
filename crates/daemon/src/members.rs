// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human identity registry, `members/<name>.yaml`.
//!
//! The scheduler treats any sender that is not a roster agent as machine
//! traffic unless it is a registered member; the exclusive-batch rule
//! hinges on that distinction, so unknown senders are surfaced loudly.

use dg_core::{Layout, Member};

pub fn load_all(layout: &Layout) -> Vec<Member> {
    let dir = layout.members_dir();
    let Ok(entries) = std::fs::read_dir(&dir) else { return Vec::new() };
    let mut members = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|e| e != "yaml") {
            continue;
        }
        match std::fs::read_to_string(&path).map_err(|e| e.to_string()).and_then(|text| {
            serde_yaml::from_str::<Member>(&text).map_err(|e| e.to_string())
        }) {
            Ok(member) => members.push(member),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping member file");
            }
        }
    }
    members
}

pub fn is_member(layout: &Layout, name: &str) -> bool {
    layout.member_path(name).exists()
}

/// Register a member on first contact so later lookups succeed.
pub fn register(layout: &Layout, name: &str) -> std::io::Result<()> {
    let path = layout.member_path(name);
    if path.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(layout.members_dir())?;
    let member = Member::new(name);
    std::fs::write(&path, serde_yaml::to_string(&member).unwrap_or_default())
}

#[cfg(test)]
#[path = "members_tests.rs"]
mod tests;
