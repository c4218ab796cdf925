// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, `protected/daemon.toml` plus environment.

use dg_core::Layout;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Credential the model transport requires at startup.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Port for the HTTP surface; 0 lets the OS pick and the chosen port
    /// is written to `protected/daemon.port`.
    pub port: u16,
    /// Command spawned per model session (the opaque transport).
    pub session_command: String,
    pub max_concurrent_turns: usize,
    pub premerge_timeout_secs: u64,
    /// Context-window utilization that rotates a session.
    pub rotation_watermark: f32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: 7777,
            session_command: "delegate-session".to_string(),
            max_concurrent_turns: 4,
            premerge_timeout_secs: 600,
            rotation_watermark: 0.8,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed daemon.toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{API_KEY_ENV} is not set; the daemon cannot start model sessions")]
    MissingApiKey,
}

impl DaemonConfig {
    /// Load from `protected/daemon.toml`, writing defaults on first run.
    pub fn load_or_init(layout: &Layout) -> Result<Self, ConfigError> {
        let path = layout.protected_dir().join("daemon.toml");
        if !path.exists() {
            let config = Self::default();
            std::fs::create_dir_all(layout.protected_dir())?;
            std::fs::write(&path, toml::to_string_pretty(&config).unwrap_or_default())?;
            return Ok(config);
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The model credential must be present before any session can spawn.
    pub fn require_api_key() -> Result<(), ConfigError> {
        match std::env::var(API_KEY_ENV) {
            Ok(v) if !v.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    pub fn premerge_timeout(&self) -> Duration {
        Duration::from_secs(self.premerge_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
