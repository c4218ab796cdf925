// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-process guard: inspects every tool invocation before execution.

use crate::config::SandboxConfig;
use crate::denylist;
use std::path::{Component, Path, PathBuf};

/// Which enforcement layer denied an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    WriteGuard,
    BashDeny,
    ToolList,
    OsSandbox,
    ToolServer,
    Network,
}

dg_core::string_enum! {
    Layer {
        WriteGuard => "write_guard",
        BashDeny => "bash_deny",
        ToolList => "tool_list",
        OsSandbox => "os_sandbox",
        ToolServer => "tool_server",
        Network => "network",
    }
}

/// A denied operation: the layer that fired and what was attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("denied by {layer}: {operation}")]
pub struct Denial {
    pub layer: Layer,
    pub operation: String,
}

impl Denial {
    fn new(layer: Layer, operation: impl Into<String>) -> Self {
        Self { layer, operation: operation.into() }
    }
}

/// Pre-execution callback for agent tool invocations.
pub struct WriteGuard {
    config: SandboxConfig,
}

impl WriteGuard {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Check a file write. The resolved absolute path must be a descendant
    /// of the agent's allow-list.
    pub fn check_write(&self, target: &Path) -> Result<PathBuf, Denial> {
        let resolved = resolve(target);
        let allowed = self
            .config
            .write_allow
            .iter()
            .chain(self.config.git_dirs.iter())
            .any(|root| resolved.starts_with(resolve(root)));
        if allowed {
            Ok(resolved)
        } else {
            Err(self.log(Denial::new(Layer::WriteGuard, format!("write {}", resolved.display()))))
        }
    }

    /// Check a bash command string against the deny-list.
    pub fn check_bash(&self, command: &str) -> Result<(), Denial> {
        match denylist::scan_bash(command) {
            None => Ok(()),
            Some(needle) => {
                Err(self.log(Denial::new(Layer::BashDeny, format!("bash contains {needle:?}"))))
            }
        }
    }

    /// Check a tool name against the disallowed list (layer 3 backstop for
    /// sessions that advertise tools anyway).
    pub fn check_tool(&self, tool: &str) -> Result<(), Denial> {
        if self.config.disallowed_tools.iter().any(|t| t == tool) {
            Err(self.log(Denial::new(Layer::ToolList, format!("tool {tool}"))))
        } else {
            Ok(())
        }
    }

    fn log(&self, denial: Denial) -> Denial {
        tracing::warn!(
            agent = %self.config.agent,
            layer = %denial.layer,
            operation = %denial.operation,
            "sandbox denial"
        );
        denial
    }
}

/// Resolve a path without requiring it to exist: canonicalize the longest
/// existing ancestor (following symlinks), then re-append the remainder
/// with `.`/`..` components folded lexically.
fn resolve(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")).join(path)
    };

    // Fold . and .. first so "allow/../etc" cannot sneak past a prefix test.
    let mut folded = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }

    // Canonicalize the longest existing prefix to resolve symlinks.
    let mut prefix = folded.clone();
    let mut tail = Vec::new();
    loop {
        match prefix.canonicalize() {
            Ok(real) => {
                let mut resolved = real;
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return resolved;
            }
            Err(_) => match (prefix.parent(), prefix.file_name()) {
                (Some(parent), Some(name)) => {
                    tail.push(name.to_os_string());
                    prefix = parent.to_path_buf();
                }
                _ => return folded,
            },
        }
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
