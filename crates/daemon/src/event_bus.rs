// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live event fan-out over the durable log.
//!
//! Every event is already persisted by the store inside the transaction
//! that caused it; the bus only carries the live copies. Subscribers that
//! fall behind (or connect late) replay from the log using their
//! `last_seen_sequence`, then switch to tailing the broadcast channel.

use dg_core::{EventEnvelope, TeamId};
use dg_storage::{Store, StorageError};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

const LIVE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    store: Arc<Store>,
    live: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(store: Arc<Store>) -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        Self { store, live }
    }

    /// Pump committed envelopes from the engine into the broadcast channel.
    pub fn spawn_forwarder(&self, mut rx: mpsc::Receiver<EventEnvelope>) {
        let live = self.live.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                // No subscribers is fine; the log already has it.
                let _ = live.send(envelope);
            }
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.live.subscribe()
    }

    /// Persisted events a late subscriber missed.
    pub fn replay(
        &self,
        team: TeamId,
        after: i64,
        limit: usize,
    ) -> Result<Vec<EventEnvelope>, StorageError> {
        self.store.read(|conn| dg_storage::events::team_events_after(conn, team, after, limit))
    }

    pub fn latest_seq(&self, team: TeamId) -> Result<i64, StorageError> {
        self.store.read(|conn| dg_storage::events::latest_team_seq(conn, team))
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
