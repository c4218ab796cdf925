// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "alice", true },
    dashed = { "code-reviewer", true },
    underscore = { "merge_bot", true },
    digits = { "agent2", true },
    empty = { "", false },
    uppercase = { "Alice", false },
    spaces = { "a b", false },
    slash = { "a/b", false },
    dotdot = { "..", false },
)]
fn agent_name_validation(name: &str, ok: bool) {
    assert_eq!(AgentName::parse(name).is_ok(), ok, "{name:?}");
}

#[test]
fn agent_name_rejects_overlong() {
    let long = "a".repeat(65);
    assert!(AgentName::parse(&long).is_err());
}

#[parameterized(
    manager = { Role::Manager, true },
    reviewer = { Role::Reviewer, true },
    engineer = { Role::Engineer, false },
)]
fn review_capability_by_role(role: Role, can: bool) {
    assert_eq!(role.can_review(), can);
}

#[test]
fn role_parse_roundtrips_display() {
    for role in [Role::Manager, Role::Engineer, Role::Reviewer] {
        assert_eq!(Role::parse(&role.to_string()), Some(role));
    }
}
