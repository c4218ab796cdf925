// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types.

use dg_core::{ErrorKind, TaskId, UserError};
use thiserror::Error;

/// Distinguished error for dependency gating: the caller retries on the
/// next tick rather than surfacing a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task} gated: {open} unresolved dependencies")]
pub struct GateError {
    pub task: TaskId,
    pub open: usize,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] dg_storage::StorageError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Gated(#[from] GateError),

    #[error(transparent)]
    Denied(#[from] dg_sandbox::Denial),

    #[error("session error: {0}")]
    Session(#[from] crate::session::SessionError),

    #[error("git failed: {0}")]
    Git(String),

    #[error("no workflow {name:?} version {version}")]
    UnknownWorkflow { name: String, version: u32 },

    #[error("unknown stage {0:?}")]
    UnknownStage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Storage(e) => e.kind(),
            EngineError::User(_) | EngineError::Gated(_) => ErrorKind::User,
            EngineError::Denied(_) => ErrorKind::SandboxDenial,
            EngineError::Session(e) => e.kind(),
            EngineError::Git(_) => ErrorKind::MergeFailure,
            EngineError::UnknownWorkflow { .. } | EngineError::UnknownStage(_) => {
                ErrorKind::Invariant
            }
            EngineError::Io(_) => ErrorKind::Transient,
        }
    }
}
