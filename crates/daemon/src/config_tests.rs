// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
fn first_run_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    let config = DaemonConfig::load_or_init(&layout).unwrap();
    assert_eq!(config.port, 7777);
    assert!(layout.protected_dir().join("daemon.toml").exists());
}

#[test]
fn reload_roundtrips_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    std::fs::create_dir_all(layout.protected_dir()).unwrap();
    std::fs::write(
        layout.protected_dir().join("daemon.toml"),
        "port = 9000\nmax_concurrent_turns = 2\n",
    )
    .unwrap();
    let config = DaemonConfig::load_or_init(&layout).unwrap();
    assert_eq!(config.port, 9000);
    assert_eq!(config.max_concurrent_turns, 2);
    // Unspecified fields keep defaults.
    assert_eq!(config.premerge_timeout_secs, 600);
}

#[test]
fn malformed_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    std::fs::create_dir_all(layout.protected_dir()).unwrap();
    std::fs::write(layout.protected_dir().join("daemon.toml"), "port = [oops").unwrap();
    assert!(matches!(DaemonConfig::load_or_init(&layout), Err(ConfigError::Parse(_))));
}

#[test]
#[serial]
fn api_key_requirement() {
    std::env::remove_var(API_KEY_ENV);
    assert!(matches!(DaemonConfig::require_api_key(), Err(ConfigError::MissingApiKey)));
    std::env::set_var(API_KEY_ENV, "sk-test");
    assert!(DaemonConfig::require_api_key().is_ok());
    std::env::remove_var(API_KEY_ENV);
}
