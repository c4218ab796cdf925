// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dg_core::{test_support, Event, TaskId};
use dg_storage::teams;

fn seeded() -> (Arc<Store>, dg_core::Team) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let team = test_support::team();
    store.with_tx(0, |tx| teams::insert_team(tx.conn(), &team)).unwrap();
    (store, team)
}

#[tokio::test]
async fn forwarder_delivers_live_events() {
    let (store, team) = seeded();
    let bus = EventBus::new(Arc::clone(&store));
    let (tx, rx) = mpsc::channel(8);
    bus.spawn_forwarder(rx);
    let mut sub = bus.subscribe();

    let (_, envelopes) = store
        .with_tx(1, |txc| {
            txc.emit(team.id, Event::MergeQueued { task: TaskId(1) })?;
            Ok(())
        })
        .unwrap();
    for envelope in envelopes {
        tx.send(envelope).await.unwrap();
    }

    let received = tokio::time::timeout(std::time::Duration::from_secs(1), sub.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.event.kind(), "merge:queued");
    assert_eq!(received.team_seq, 1);
}

#[tokio::test]
async fn replay_serves_missed_events() {
    let (store, team) = seeded();
    let bus = EventBus::new(Arc::clone(&store));
    for i in 1..=4 {
        store
            .with_tx(i, |txc| {
                txc.emit(team.id, Event::MergeQueued { task: TaskId(i as i64) })?;
                Ok(())
            })
            .unwrap();
    }
    let missed = bus.replay(team.id, 2, 100).unwrap();
    assert_eq!(missed.len(), 2);
    assert_eq!(missed[0].team_seq, 3);
    assert_eq!(bus.latest_seq(team.id).unwrap(), 4);
}
