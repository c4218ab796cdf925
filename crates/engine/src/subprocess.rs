// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess invocation with timeouts and empty stdin.
//!
//! Every child the daemon spawns gets `stdin=/dev/null`: nothing the
//! engine runs may ever prompt.

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Timeout for git plumbing (worktree add/remove, rev-parse, rebase).
pub const GIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum SubprocessError {
    #[error("{label} timed out after {timeout:?}")]
    Timeout { label: &'static str, timeout: Duration },
    #[error("{label} failed to spawn: {source}")]
    Spawn {
        label: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Run a command to completion with a timeout. The child is killed on
/// timeout (`kill_on_drop`).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &'static str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    let fut = cmd.output();
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Spawn { label, source }),
        Err(_) => Err(SubprocessError::Timeout { label, timeout }),
    }
}

/// Trailing `n` lines of combined output, for failure reports.
pub fn tail(output: &Output, n: usize) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
