// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dg-daemon: the Delegate daemon.
//!
//! Owns the protected directory, wires the engine together (store, event
//! bus, scheduler, merge worker, session manager), and serves the HTTP
//! surface the browser UI and the CLI talk to.

pub mod config;
pub mod event_bus;
pub mod http;
pub mod lifecycle;
pub mod members;
pub mod protocol;
pub mod teamfs;
pub mod workflows;

pub use config::DaemonConfig;
pub use event_bus::EventBus;
pub use lifecycle::{shutdown, startup, DaemonHandle, LifecycleError};
