// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error type.

use dg_core::{ErrorKind, UserError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("migration {version} failed: {detail}")]
    MigrationFailed { version: u32, detail: String },

    #[error("schema health check failed: {0}")]
    HealthCheck(String),

    #[error("database schema v{found} is newer than this daemon supports (v{supported})")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    User(#[from] UserError),
}

impl StorageError {
    /// Classification for catch boundaries.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::User(_) => ErrorKind::User,
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                ErrorKind::Transient
            }
            StorageError::MigrationFailed { .. }
            | StorageError::HealthCheck(_)
            | StorageError::SchemaTooNew { .. }
            | StorageError::Corrupt(_) => ErrorKind::Invariant,
            _ => ErrorKind::Transient,
        }
    }
}
