// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn layout() -> (Layout, TeamId, AgentName) {
    let team = TeamId::new();
    let agent = AgentName::parse("alice").unwrap();
    (Layout::new("/srv/delegate"), team, agent)
}

#[test]
fn protected_paths_live_under_protected() {
    let (layout, _, _) = layout();
    for path in [
        layout.lock_path(),
        layout.pid_path(),
        layout.db_path(),
        layout.network_path(),
        layout.backups_dir(),
    ] {
        assert!(path.starts_with("/srv/delegate/protected"), "{}", path.display());
    }
}

#[test]
fn worktree_path_shape() {
    let (layout, team, agent) = layout();
    let path = layout.worktree_dir(team, &agent, TaskId(1), &RepoName::from("app"));
    let expected = format!("/srv/delegate/teams/{}/agents/alice/tasks/T0001/app", team);
    assert_eq!(path, std::path::PathBuf::from(expected));
}

#[test]
fn member_path_appends_yaml() {
    let (layout, _, _) = layout();
    assert_eq!(layout.member_path("pat"), PathBuf::from("/srv/delegate/members/pat.yaml"));
}

#[test]
fn discover_honors_env_override() {
    // Env mutation is process-global; keep both checks in one test.
    std::env::set_var(HOME_ENV, "/tmp/dg-test-home");
    assert_eq!(Layout::discover().home(), Path::new("/tmp/dg-test-home"));
    std::env::remove_var(HOME_ENV);
}
