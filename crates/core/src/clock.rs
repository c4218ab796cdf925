// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Everything durable in Delegate is stamped with epoch milliseconds (the
//! store columns, event envelopes, backup names); `Instant` only feeds
//! in-process arithmetic like backoff windows. The fake keeps one logical
//! offset and derives both views from it, so advancing test time can never
//! move the two out of step.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Starting epoch for fake time; an obviously-synthetic round number.
const FAKE_EPOCH_MS: u64 = 1_000_000;

/// Fake clock for testing with controllable time.
///
/// `now()` is the construction instant plus everything advanced so far;
/// `epoch_ms()` tracks the same offset from [`FAKE_EPOCH_MS`] unless
/// pinned with [`FakeClock::set_epoch_ms`].
#[derive(Clone)]
pub struct FakeClock {
    started: Instant,
    state: Arc<Mutex<FakeState>>,
}

struct FakeState {
    epoch_ms: u64,
    advanced: Duration,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Arc::new(Mutex::new(FakeState {
                epoch_ms: FAKE_EPOCH_MS,
                advanced: Duration::ZERO,
            })),
        }
    }

    /// Advance both views of time by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.advanced += duration;
        state.epoch_ms += duration.as_millis() as u64;
    }

    /// Pin the epoch milliseconds value (monotonic time is unaffected).
    pub fn set_epoch_ms(&self, ms: u64) {
        self.state.lock().epoch_ms = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.started + self.state.lock().advanced
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
