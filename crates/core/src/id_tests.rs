// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn session_id_has_prefix_and_fixed_length() {
    let id = SessionId::new();
    assert!(id.as_str().starts_with("ses-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn session_ids_are_unique() {
    let a = SessionId::new();
    let b = SessionId::new();
    assert_ne!(a, b);
}

#[test]
fn suffix_strips_prefix() {
    let id = SessionId::from_string("ses-abc");
    assert_eq!(id.suffix(), "abc");
}

#[test]
fn idbuf_roundtrips_serde() {
    let id = SessionId::new();
    let json = serde_json::to_string(&id).unwrap();
    let back: SessionId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

#[test]
fn idbuf_borrow_matches_str_hash() {
    use std::collections::HashMap;
    let id = SessionId::new();
    let mut map: HashMap<SessionId, u32> = HashMap::new();
    map.insert(id, 1);
    assert_eq!(map.get(id.as_str()), Some(&1));
}

#[test]
fn short_truncates() {
    assert_eq!(short("abcdef", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
}
