// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dg_core::Layout;
use serial_test::serial;

fn set_api_key() {
    std::env::set_var(crate::config::API_KEY_ENV, "sk-test");
}

fn clear_api_key() {
    std::env::remove_var(crate::config::API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn startup_creates_protected_layout() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());

    set_api_key();
    let handle = startup(layout.clone()).await.unwrap();
    clear_api_key();

    assert!(layout.lock_path().exists());
    assert!(layout.pid_path().exists());
    assert!(layout.db_path().exists());
    assert!(layout.network_path().exists());

    shutdown(&handle).await;
    assert!(!handle.layout.pid_path().exists());
}

#[tokio::test]
#[serial]
async fn second_daemon_is_refused_with_pid() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());

    set_api_key();
    let first = startup(layout.clone()).await.unwrap();
    let second = startup(layout.clone()).await;
    clear_api_key();

    let err = second.err().expect("second daemon must be refused");
    assert!(matches!(err, LifecycleError::LockHeld(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains(&std::process::id().to_string()));

    // The first daemon is undisturbed.
    assert!(first.layout.lock_path().exists());
    shutdown(&first).await;
}

#[tokio::test]
#[serial]
async fn missing_api_key_refuses_startup() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());
    clear_api_key();
    let err = startup(layout).await.err().expect("startup must fail");
    assert!(matches!(err, LifecycleError::Config(_)));
}

#[tokio::test]
#[serial]
async fn restart_after_shutdown_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());

    set_api_key();
    let first = startup(layout.clone()).await.unwrap();
    shutdown(&first).await;
    drop(first); // releases the lock

    let second = startup(layout).await.unwrap();
    clear_api_key();
    shutdown(&second).await;
}

#[tokio::test]
#[serial]
async fn restart_applies_no_new_migrations_or_backups() {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.path());

    set_api_key();
    let first = startup(layout.clone()).await.unwrap();
    shutdown(&first).await;
    drop(first);
    let backups_before =
        std::fs::read_dir(layout.backups_dir()).map(|d| d.count()).unwrap_or(0);

    let second = startup(layout.clone()).await.unwrap();
    clear_api_key();
    shutdown(&second).await;

    let backups_after =
        std::fs::read_dir(layout.backups_dir()).map(|d| d.count()).unwrap_or(0);
    assert_eq!(backups_before, backups_after, "restart must not snapshot again");
}
