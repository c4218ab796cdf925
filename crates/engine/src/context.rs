// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handles every engine component carries.

use crate::error::EngineError;
use dg_core::{Clock, EventEnvelope, Layout};
use dg_storage::{Store, TxCtx};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The engine's view of the world: the store, the filesystem layout, the
/// clock, and the channel live events are forwarded on after commit.
///
/// Cloneable; all components share the same underlying handles.
#[derive(Clone)]
pub struct EngineCtx<C: Clock> {
    pub store: Arc<Store>,
    pub layout: Layout,
    pub clock: C,
    event_tx: mpsc::Sender<EventEnvelope>,
}

impl<C: Clock> EngineCtx<C> {
    pub fn new(
        store: Arc<Store>,
        layout: Layout,
        clock: C,
        event_tx: mpsc::Sender<EventEnvelope>,
    ) -> Self {
        Self { store, layout, clock, event_tx }
    }

    /// Run a transaction and forward the committed events to the live bus.
    ///
    /// Durability comes from the store; the forward is best-effort: a
    /// saturated channel drops the live copy and subscribers catch up from
    /// the log.
    pub fn commit<T>(
        &self,
        f: impl FnOnce(&mut TxCtx<'_>) -> Result<T, dg_storage::StorageError>,
    ) -> Result<T, EngineError> {
        let (value, envelopes) = self.store.with_tx(self.clock.epoch_ms(), f)?;
        for envelope in envelopes {
            if self.event_tx.try_send(envelope).is_err() {
                tracing::warn!("live event channel full; subscriber catch-up will cover it");
            }
        }
        Ok(value)
    }
}
