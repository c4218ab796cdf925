// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn init_creates_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("protected/network.yaml");
    let list = NetworkAllowlist::load_or_init(&path).unwrap();
    assert!(path.exists());
    assert!(list.contains("api.anthropic.com"));
}

#[test]
fn allow_and_disallow_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("network.yaml");
    let mut list = NetworkAllowlist::load_or_init(&path).unwrap();

    assert!(list.allow_domain("crates.io"));
    assert!(!list.allow_domain("crates.io"), "duplicate add is a no-op");
    list.save(&path).unwrap();

    let mut reloaded = NetworkAllowlist::load_or_init(&path).unwrap();
    assert!(reloaded.contains("crates.io"));
    assert!(reloaded.disallow_domain("crates.io"));
    assert!(!reloaded.disallow_domain("crates.io"));
}

#[test]
fn malformed_yaml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("network.yaml");
    std::fs::write(&path, "allow: {not: [valid").unwrap();
    assert!(matches!(NetworkAllowlist::load_or_init(&path), Err(NetworkError::Parse(_))));
}
