// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::Store;
use crate::teams;
use dg_core::test_support;
use dg_core::{StageKey, Team, WorkflowRef};

fn seeded() -> (Store, Team) {
    let store = Store::open_in_memory().unwrap();
    let team = test_support::team();
    store.with_tx(0, |ctx| teams::insert_team(ctx.conn(), &team)).unwrap();
    (store, team)
}

fn create(store: &Store, team: &Team, title: &str, deps: &[TaskId]) -> Task {
    let mut new = NewTask::new(title, WorkflowRef::new("default", 1));
    new.depends_on = deps.iter().copied().collect();
    store
        .with_tx(1_000, |ctx| insert(ctx.conn(), team.id, &team.name, &new, ctx.now_ms()))
        .unwrap()
        .0
}

fn move_to(store: &Store, id: TaskId, stage: &str) {
    store
        .with_tx(2_000, |ctx| set_status(ctx.conn(), id, &StageKey::new(stage), None, ctx.now_ms()))
        .unwrap();
}

#[test]
fn insert_assigns_sequential_ids_and_branches() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    let t2 = create(&store, &team, "two", &[]);
    assert_eq!(t1.id, TaskId(1));
    assert_eq!(t2.id, TaskId(2));
    assert_eq!(t2.branch, "delegate/acme/T0002");
    assert_eq!(t2.status, StageKey::new(StageKey::TODO));
}

#[test]
fn deps_are_persisted_and_loaded() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    let t2 = create(&store, &team, "two", &[t1.id]);
    let loaded = store.read(|conn| require(conn, t2.id)).unwrap();
    assert!(loaded.depends_on.contains(&t1.id));
}

#[test]
fn deps_terminal_tracks_status() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    let t2 = create(&store, &team, "two", &[t1.id]);

    assert!(!store.read(|conn| deps_terminal(conn, t2.id)).unwrap());
    move_to(&store, t1.id, StageKey::DONE);
    assert!(store.read(|conn| deps_terminal(conn, t2.id)).unwrap());
}

#[test]
fn freeze_rule_rejects_add_after_deps_resolve() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    let t2 = create(&store, &team, "two", &[t1.id]);
    let t3 = create(&store, &team, "three", &[]);

    move_to(&store, t1.id, StageKey::DONE);

    let err = store
        .with_tx(3_000, |ctx| add_dependency(ctx.conn(), t2.id, t3.id, ctx.now_ms()))
        .unwrap_err();
    assert!(matches!(err, StorageError::User(ref u) if u.code == dg_core::ErrorCode::DepsFrozen));

    // Unchanged set.
    let loaded = store.read(|conn| require(conn, t2.id)).unwrap();
    assert_eq!(loaded.depends_on.len(), 1);
}

#[test]
fn add_dep_allowed_while_existing_open() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    let t2 = create(&store, &team, "two", &[t1.id]);
    let t3 = create(&store, &team, "three", &[]);

    store
        .with_tx(3_000, |ctx| add_dependency(ctx.conn(), t2.id, t3.id, ctx.now_ms()))
        .unwrap();
    let loaded = store.read(|conn| require(conn, t2.id)).unwrap();
    assert_eq!(loaded.depends_on.len(), 2);
}

#[test]
fn remove_dep_always_allowed() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    let t2 = create(&store, &team, "two", &[t1.id]);
    move_to(&store, t1.id, StageKey::DONE);

    let removed = store
        .with_tx(3_000, |ctx| remove_dependency(ctx.conn(), t2.id, t1.id, ctx.now_ms()))
        .unwrap()
        .0;
    assert!(removed);
}

#[test]
fn terminal_status_stamps_completed_at() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    move_to(&store, t1.id, StageKey::DONE);
    let loaded = store.read(|conn| require(conn, t1.id)).unwrap();
    assert!(loaded.completed_at_ms.is_some());
    assert!(loaded.is_terminal());
}

#[test]
fn base_shas_capture_once() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    let mut shas = BTreeMap::new();
    shas.insert(RepoName::from("app"), "abc0000".to_string());

    store
        .with_tx(2_000, |ctx| capture_base_shas(ctx.conn(), t1.id, &shas, ctx.now_ms()))
        .unwrap();
    let err = store
        .with_tx(2_001, |ctx| capture_base_shas(ctx.conn(), t1.id, &shas, ctx.now_ms()))
        .unwrap_err();
    assert!(matches!(err, StorageError::Corrupt(_)));
}

#[test]
fn list_excludes_terminal_by_default() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    let _t2 = create(&store, &team, "two", &[]);
    move_to(&store, t1.id, StageKey::CANCELLED);

    let filter = TaskFilter { team: Some(team.id), ..Default::default() };
    let open = store.read(|conn| list(conn, &filter)).unwrap();
    assert_eq!(open.len(), 1);

    let all = store
        .read(|conn| list(conn, &TaskFilter { team: Some(team.id), include_terminal: true, ..Default::default() }))
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn attachments_add_and_remove() {
    let (store, team) = seeded();
    let t1 = create(&store, &team, "one", &[]);
    store
        .with_tx(2_000, |ctx| add_attachment(ctx.conn(), t1.id, "notes.md", ctx.now_ms()))
        .unwrap();
    store
        .with_tx(2_001, |ctx| add_attachment(ctx.conn(), t1.id, "notes.md", ctx.now_ms()))
        .unwrap();
    let loaded = store.read(|conn| require(conn, t1.id)).unwrap();
    assert_eq!(loaded.attachments, vec!["notes.md".to_string()]);

    store
        .with_tx(2_002, |ctx| remove_attachment(ctx.conn(), t1.id, "notes.md", ctx.now_ms()))
        .unwrap();
    let loaded = store.read(|conn| require(conn, t1.id)).unwrap();
    assert!(loaded.attachments.is_empty());
}
