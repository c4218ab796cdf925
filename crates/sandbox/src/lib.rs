// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dg-sandbox: the layered enforcement that bounds what agent-issued tools
//! may touch.
//!
//! Layers, applied in order (any one is sufficient to deny):
//! 1. write-path guard: every file-writing tool call is checked against the
//!    agent's allow-list before execution
//! 2. bash deny-list: command strings are scanned for forbidden substrings
//! 3. disallowed-tool list: denied git verbs are never advertised to the model
//! 4. OS sandbox: the bash subprocess runs inside a platform sandbox whose
//!    writable set is the agent's directories plus repo `.git` dirs
//! 5. tool-server boundary: protected-data operations run inside the daemon
//!    (enforced there, configured here)
//! 6. network allowlist: egress domains from `protected/network.yaml`
//!
//! Every dangerous operation is blocked by at least two layers; denials
//! record which layer fired.

mod config;
mod denylist;
mod guard;
mod network;
mod profile;

pub use config::SandboxConfig;
pub use denylist::{scan_bash, DENIED_GIT_VERBS, DISALLOWED_TOOLS};
pub use guard::{Denial, Layer, WriteGuard};
pub use network::NetworkAllowlist;
pub use profile::{sandbox_runner_available, OsSandboxProfile};
