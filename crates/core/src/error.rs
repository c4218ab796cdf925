// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy.
//!
//! Layer crates define their own `thiserror` enums; each classifies into
//! one of the five [`ErrorKind`]s, which decides how the failure surfaces
//! (toast, inline message, banner, tool result, or task transition).

use serde::{Deserialize, Serialize};

/// How an error should be treated at a catch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid input or violated precondition. Non-fatal, one-line message.
    User,
    /// Rate limit, network blip, DB contention. Retried with backoff.
    Transient,
    /// A core guarantee broken. Fatal for the operation, loud event.
    Invariant,
    /// An agent attempted a forbidden operation. Returned as a tool result.
    SandboxDenial,
    /// Rebase or pre-merge test failed. Task transitions to merge_failed.
    MergeFailure,
}

crate::string_enum! {
    ErrorKind {
        User => "user",
        Transient => "transient",
        Invariant => "invariant",
        SandboxDenial => "sandbox_denial",
        MergeFailure => "merge_failure",
    }
}

/// Stable machine-readable codes for user-facing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DepsFrozen,
    DepsUnresolved,
    TaskTerminal,
    UnknownTask,
    UnknownTeam,
    UnknownAgent,
    UnknownRepo,
    DuplicateName,
    StaleSha,
    BadArgument,
    DaemonRunning,
    DaemonNotRunning,
}

crate::string_enum! {
    ErrorCode {
        DepsFrozen => "deps_frozen",
        DepsUnresolved => "deps_unresolved",
        TaskTerminal => "task_terminal",
        UnknownTask => "unknown_task",
        UnknownTeam => "unknown_team",
        UnknownAgent => "unknown_agent",
        UnknownRepo => "unknown_repo",
        DuplicateName => "duplicate_name",
        StaleSha => "stale_sha",
        BadArgument => "bad_argument",
        DaemonRunning => "daemon_running",
        DaemonNotRunning => "daemon_not_running",
    }
}

/// A user-facing error: stable code plus one human line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct UserError {
    pub code: ErrorCode,
    pub message: String,
}

impl UserError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}
