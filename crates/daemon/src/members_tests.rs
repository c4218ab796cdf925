// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn register_is_idempotent_and_discoverable() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());

    assert!(!is_member(&layout, "pat"));
    register(&layout, "pat").unwrap();
    register(&layout, "pat").unwrap();
    assert!(is_member(&layout, "pat"));

    let members = load_all(&layout);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "pat");
}

#[test]
fn broken_member_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    std::fs::create_dir_all(layout.members_dir()).unwrap();
    std::fs::write(layout.members_dir().join("ok.yaml"), "name: ok\n").unwrap();
    std::fs::write(layout.members_dir().join("bad.yaml"), "name: [").unwrap();
    std::fs::write(layout.members_dir().join("notes.txt"), "ignored").unwrap();

    let members = load_all(&layout);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "ok");
}
