// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS-level sandbox profile for agent bash subprocesses.
//!
//! The writable set is: the team working directory, the platform temp
//! directory, and each registered repo's `.git/` directory. The repo
//! working tree and the protected directory are excluded. Rendering is
//! platform-specific: `sandbox-exec` profile text on macOS, `bwrap`
//! arguments on Linux; on other platforms the command runs unwrapped and
//! the inner layers carry the enforcement.

use crate::config::SandboxConfig;
use dg_core::Layout;
use std::path::PathBuf;

/// Whether the platform wrapper binary is on PATH. When it is absent the
/// caller runs bash unwrapped and the inner layers carry the enforcement
/// (the spec's "subject to platform honoring it" escape hatch).
pub fn sandbox_runner_available() -> bool {
    let program = if cfg!(target_os = "macos") {
        "sandbox-exec"
    } else if cfg!(target_os = "linux") {
        "bwrap"
    } else {
        return false;
    };
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsSandboxProfile {
    pub writable: Vec<PathBuf>,
    pub network_allow: Vec<String>,
}

impl OsSandboxProfile {
    pub fn for_config(layout: &Layout, config: &SandboxConfig) -> Self {
        let mut writable = vec![layout.team_dir(config.team), std::env::temp_dir()];
        writable.extend(config.git_dirs.iter().cloned());
        Self { writable, network_allow: config.network_allow.clone() }
    }

    /// macOS seatbelt profile text for `sandbox-exec -p`.
    pub fn seatbelt_profile(&self) -> String {
        let mut profile = String::from(
            "(version 1)\n(allow default)\n(deny file-write*)\n(allow file-write*\n",
        );
        for path in &self.writable {
            profile.push_str(&format!("    (subpath \"{}\")\n", path.display()));
        }
        profile.push_str(")\n");
        if !self.network_allow.is_empty() {
            profile.push_str("(deny network-outbound)\n(allow network-outbound (remote ip \"localhost\"))\n");
        }
        profile
    }

    /// `bwrap` argument vector for Linux.
    pub fn bwrap_args(&self) -> Vec<String> {
        let mut args = vec![
            "--ro-bind".to_string(),
            "/".to_string(),
            "/".to_string(),
            "--dev".to_string(),
            "/dev".to_string(),
            "--proc".to_string(),
            "/proc".to_string(),
        ];
        for path in &self.writable {
            let p = path.display().to_string();
            args.push("--bind".to_string());
            args.push(p.clone());
            args.push(p);
        }
        args.push("--die-with-parent".to_string());
        args
    }

    /// Wrap `bash -c <command>` in the platform sandbox. Returns the program
    /// and argument vector to exec.
    pub fn wrap_bash(&self, command: &str) -> (String, Vec<String>) {
        #[cfg(target_os = "macos")]
        {
            (
                "sandbox-exec".to_string(),
                vec![
                    "-p".to_string(),
                    self.seatbelt_profile(),
                    "bash".to_string(),
                    "-c".to_string(),
                    command.to_string(),
                ],
            )
        }
        #[cfg(target_os = "linux")]
        {
            let mut args = self.bwrap_args();
            args.push("bash".to_string());
            args.push("-c".to_string());
            args.push(command.to_string());
            ("bwrap".to_string(), args)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            ("bash".to_string(), vec!["-c".to_string(), command.to_string()])
        }
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
