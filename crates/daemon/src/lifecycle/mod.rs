// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: singleton lock, startup wiring, shutdown.

mod startup;

pub use startup::{startup, DaemonHandle};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another daemon holds the lock{0}")]
    LockHeld(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Storage(#[from] dg_storage::StorageError),

    #[error("network allowlist: {0}")]
    Network(String),

    #[error("bind failed on port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

impl LifecycleError {
    /// Exit code the CLI maps this to: duplicate daemon and broken
    /// migrations are invariant violations (2), the rest internal (3).
    pub fn exit_code(&self) -> i32 {
        match self {
            LifecycleError::LockHeld(_) => 2,
            LifecycleError::Storage(e) if e.kind() == dg_core::ErrorKind::Invariant => 2,
            _ => 3,
        }
    }
}

/// Graceful shutdown: stop admitting turns, drain in-flight work briefly,
/// close sessions, release the lock by exiting.
pub async fn shutdown(handle: &DaemonHandle) {
    tracing::info!("daemon shutting down");
    handle.cancel.cancel();
    handle.sessions.close_all().await;

    // Drain grace: give spawned turns a moment to observe cancellation.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let _ = std::fs::remove_file(handle.layout.pid_path());
    let _ = std::fs::remove_file(handle.layout.port_path());
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
