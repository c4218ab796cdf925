// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::Store;
use crate::tasks::{self, NewTask};
use crate::teams;
use dg_core::test_support;
use dg_core::{Team, WorkflowRef};

fn seeded_task() -> (Store, Team, TaskId) {
    let store = Store::open_in_memory().unwrap();
    let team = test_support::team();
    let task = store
        .with_tx(0, |ctx| {
            teams::insert_team(ctx.conn(), &team)?;
            let new = NewTask::new("work", WorkflowRef::new("default", 1));
            tasks::insert(ctx.conn(), team.id, &team.name, &new, ctx.now_ms())
        })
        .unwrap()
        .0;
    (store, team, task.id)
}

#[test]
fn attempts_number_sequentially() {
    let (store, _, task) = seeded_task();
    let r1 = store
        .with_tx(1, |ctx| {
            insert(ctx.conn(), task, "rex", "looks off", &[], ReviewDecision::ChangesRequested, 1)
        })
        .unwrap()
        .0;
    let r2 = store
        .with_tx(2, |ctx| {
            insert(ctx.conn(), task, "rex", "ship it", &[], ReviewDecision::Approved, 2)
        })
        .unwrap()
        .0;
    assert_eq!(r1.attempt, 1);
    assert_eq!(r2.attempt, 2);
}

#[test]
fn comments_roundtrip() {
    let (store, _, task) = seeded_task();
    let comments = vec![ReviewComment { file: "src/api.rs".into(), line: 42, body: "typo".into() }];
    store
        .with_tx(1, |ctx| {
            insert(
                ctx.conn(),
                task,
                "rex",
                "minor",
                &comments,
                ReviewDecision::ChangesRequested,
                1,
            )
        })
        .unwrap();
    let loaded = store.read(|conn| for_task(conn, task)).unwrap();
    assert_eq!(loaded[0].comments, comments);
}

#[test]
fn latest_returns_newest_attempt() {
    let (store, _, task) = seeded_task();
    assert!(store.read(|conn| latest(conn, task)).unwrap().is_none());
    store
        .with_tx(1, |ctx| {
            insert(ctx.conn(), task, "rex", "no", &[], ReviewDecision::ChangesRequested, 1)
        })
        .unwrap();
    store
        .with_tx(2, |ctx| insert(ctx.conn(), task, "rex", "yes", &[], ReviewDecision::Approved, 2))
        .unwrap();
    let newest = store.read(|conn| latest(conn, task)).unwrap().unwrap();
    assert_eq!(newest.decision, ReviewDecision::Approved);
    assert_eq!(newest.attempt, 2);
}
