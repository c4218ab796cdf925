// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn connect_without_port_file_is_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    let err = DaemonClient::connect(&layout).err().unwrap();
    assert_eq!(err.code, 1);
    assert!(err.message.contains("not running"));
}

#[test]
fn connect_with_garbage_port_file_is_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    std::fs::create_dir_all(layout.protected_dir()).unwrap();
    std::fs::write(layout.port_path(), "not-a-port\n").unwrap();
    assert!(DaemonClient::connect(&layout).is_err());
}

#[test]
fn connect_reads_port() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    std::fs::create_dir_all(layout.protected_dir()).unwrap();
    std::fs::write(layout.port_path(), "8123\n").unwrap();
    let client = DaemonClient::connect(&layout).unwrap();
    assert!(client.base.ends_with(":8123"));
}
