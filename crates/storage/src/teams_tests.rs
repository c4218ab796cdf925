// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::Store;
use dg_core::test_support;
use dg_core::Team;

#[test]
fn team_roundtrip_and_lookup_by_name() {
    let store = Store::open_in_memory().unwrap();
    let mut team = test_support::team();
    team.charter = "ship good software".into();
    team.models.insert(Role::Manager, "claude-opus-4-5".into());

    store.with_tx(0, |ctx| insert_team(ctx.conn(), &team)).unwrap();

    let by_id = store.read(|conn| get_team(conn, team.id)).unwrap().unwrap();
    assert_eq!(by_id.charter, team.charter);
    assert_eq!(by_id.model_for(Role::Manager), "claude-opus-4-5");

    let by_name = store.read(|conn| team_by_name(conn, "acme")).unwrap().unwrap();
    assert_eq!(by_name.id, team.id);
}

#[test]
fn duplicate_team_name_is_user_error() {
    let store = Store::open_in_memory().unwrap();
    let a = Team::new("acme", 0);
    let b = Team::new("acme", 1);
    store.with_tx(0, |ctx| insert_team(ctx.conn(), &a)).unwrap();
    let err = store.with_tx(1, |ctx| insert_team(ctx.conn(), &b)).unwrap_err();
    assert!(matches!(err, StorageError::User(ref u) if u.code == dg_core::ErrorCode::DuplicateName));
}

#[test]
fn delete_team_cascades_agents() {
    let store = Store::open_in_memory().unwrap();
    let team = test_support::team();
    let agent = test_support::agent(team.id, "alice", Role::Engineer);
    store
        .with_tx(0, |ctx| {
            insert_team(ctx.conn(), &team)?;
            insert_agent(ctx.conn(), &agent)
        })
        .unwrap();

    let removed = store.with_tx(1, |ctx| delete_team(ctx.conn(), team.id)).unwrap().0;
    assert!(removed);
    assert!(store.read(|conn| list_agents(conn, team.id)).unwrap().is_empty());
}

#[test]
fn duplicate_agent_name_in_team_is_user_error() {
    let store = Store::open_in_memory().unwrap();
    let team = test_support::team();
    store.with_tx(0, |ctx| insert_team(ctx.conn(), &team)).unwrap();

    let a = test_support::agent(team.id, "alice", Role::Engineer);
    store.with_tx(0, |ctx| insert_agent(ctx.conn(), &a)).unwrap();
    let again = test_support::agent(team.id, "alice", Role::Manager);
    let err = store.with_tx(1, |ctx| insert_agent(ctx.conn(), &again)).unwrap_err();
    assert!(matches!(err, StorageError::User(_)));
}

#[test]
fn repo_upsert_and_approval_update() {
    let store = Store::open_in_memory().unwrap();
    let team = test_support::team();
    store.with_tx(0, |ctx| insert_team(ctx.conn(), &team)).unwrap();

    let repo = RepoConfig::new("app", "/srv/app").premerge_cmd("cargo test");
    store.with_tx(0, |ctx| insert_repo(ctx.conn(), team.id, &repo)).unwrap();

    // Re-registering updates in place.
    let repo2 = RepoConfig::new("app", "/srv/app2");
    store.with_tx(1, |ctx| insert_repo(ctx.conn(), team.id, &repo2)).unwrap();
    let repos = store.read(|conn| list_repos(conn, team.id)).unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].path, PathBuf::from("/srv/app2"));

    let updated = store
        .with_tx(2, |ctx| {
            set_repo_approval(ctx.conn(), team.id, &RepoName::from("app"), ApprovalPolicy::Auto)
        })
        .unwrap()
        .0;
    assert!(updated);
    let repos = store.read(|conn| list_repos(conn, team.id)).unwrap();
    assert_eq!(repos[0].approval, ApprovalPolicy::Auto);
}
