// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dg start` / `dg stop` / `dg status`.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use dg_core::Layout;
use std::time::Duration;

const START_WAIT: Duration = Duration::from_secs(15);

/// Start the daemon. Foreground runs it in-process; otherwise `dgd` is
/// spawned detached and we wait for the port file.
pub async fn start(layout: &Layout, foreground: bool) -> Result<(), ExitError> {
    if let Some(pid) = running_pid(layout).await {
        return Err(ExitError::invariant(format!("daemon already running (pid {pid})")));
    }

    if foreground {
        let status = dgd_command()?
            .status()
            .await
            .map_err(|e| ExitError::internal(format!("spawn dgd: {e}")))?;
        return match status.code() {
            Some(0) | None => Ok(()),
            Some(code) => Err(ExitError::new(code, "daemon exited")),
        };
    }

    let _ = std::fs::remove_file(layout.port_path());
    let child = dgd_command()?
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ExitError::internal(format!("spawn dgd: {e}")))?;
    let pid = child.id().unwrap_or_default();

    let deadline = std::time::Instant::now() + START_WAIT;
    while std::time::Instant::now() < deadline {
        if layout.port_path().exists() {
            if let Ok(client) = DaemonClient::connect(layout) {
                if client.get("/api/status").await.is_ok() {
                    println!("daemon started (pid {pid})");
                    return Ok(());
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(ExitError::internal("daemon did not become ready in time; see protected/logs/"))
}

pub async fn stop(layout: &Layout) -> Result<(), ExitError> {
    let client = DaemonClient::connect(layout)?;
    client.post("/api/admin/shutdown", serde_json::json!({})).await?;
    println!("daemon stopping");
    Ok(())
}

pub async fn status(layout: &Layout) -> Result<(), ExitError> {
    match DaemonClient::connect(layout) {
        Err(_) => {
            println!("daemon: stopped");
            Ok(())
        }
        Ok(client) => match client.get("/api/status").await {
            Ok(body) => {
                println!(
                    "daemon: running (pid {}, v{}, up {}s, {} team(s))",
                    body["pid"], body["version"], body["uptime_secs"], body["team_count"]
                );
                Ok(())
            }
            Err(_) => {
                // Port file exists but nothing answers: a stale file from a
                // crash. The advisory lock guarantees no daemon is up.
                println!("daemon: stopped (stale port file)");
                Ok(())
            }
        },
    }
}

/// PID of the live daemon, verified by actually reaching it.
async fn running_pid(layout: &Layout) -> Option<u64> {
    let client = DaemonClient::connect(layout).ok()?;
    let status = client.get("/api/status").await.ok()?;
    status["pid"].as_u64()
}

fn dgd_command() -> Result<tokio::process::Command, ExitError> {
    // dgd ships next to dg.
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join("dgd")))
        .filter(|p| p.exists());
    Ok(match sibling {
        Some(path) => tokio::process::Command::new(path),
        None => tokio::process::Command::new("dgd"),
    })
}
