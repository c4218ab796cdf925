// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global egress allowlist, `protected/network.yaml`.
//!
//! Edits go through the CLI; the daemon reloads and rotates all active
//! sessions so the OS sandbox config is re-derived.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed network.yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Domains agents may reach. Everything else is blocked by the OS sandbox
/// (subject to the platform honoring it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAllowlist {
    #[serde(default)]
    pub allow: Vec<String>,
}

impl Default for NetworkAllowlist {
    fn default() -> Self {
        // The model API endpoint must stay reachable or every turn dies.
        Self { allow: vec!["api.anthropic.com".to_string()] }
    }
}

impl NetworkAllowlist {
    /// Load from `network.yaml`, creating the default file if absent.
    pub fn load_or_init(path: &Path) -> Result<Self, NetworkError> {
        if !path.exists() {
            let list = Self::default();
            list.save(path)?;
            return Ok(list);
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), NetworkError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Add a domain. Returns false when already present.
    pub fn allow_domain(&mut self, domain: &str) -> bool {
        if self.allow.iter().any(|d| d == domain) {
            return false;
        }
        self.allow.push(domain.to_string());
        true
    }

    /// Remove a domain. Returns false when not present.
    pub fn disallow_domain(&mut self, domain: &str) -> bool {
        let before = self.allow.len();
        self.allow.retain(|d| d != domain);
        self.allow.len() != before
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.allow.iter().any(|d| d == domain)
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
