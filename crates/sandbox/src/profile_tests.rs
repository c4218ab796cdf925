// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::SandboxConfig;
use dg_core::{test_support, Layout, RepoConfig, Role, TeamId};

fn profile() -> (OsSandboxProfile, Layout, TeamId) {
    let layout = Layout::new("/srv/delegate");
    let team = TeamId::new();
    let repo = RepoConfig::new("app", "/srv/app");
    let config = SandboxConfig::for_agent(
        &layout,
        team,
        &test_support::name("alice"),
        Role::Engineer,
        std::slice::from_ref(&repo),
        vec!["api.anthropic.com".into()],
        &[],
    );
    (OsSandboxProfile::for_config(&layout, &config), layout, team)
}

#[test]
fn writable_set_is_team_dir_temp_and_git_dirs() {
    let (profile, layout, team) = profile();
    assert!(profile.writable.contains(&layout.team_dir(team)));
    assert!(profile.writable.contains(&std::env::temp_dir()));
    assert!(profile.writable.contains(&std::path::PathBuf::from("/srv/app/.git")));
    // The repo working tree is not in the writable set.
    assert!(!profile.writable.contains(&std::path::PathBuf::from("/srv/app")));
}

#[test]
fn seatbelt_profile_denies_by_default() {
    let (profile, _, _) = profile();
    let text = profile.seatbelt_profile();
    assert!(text.contains("(deny file-write*)"));
    assert!(text.contains("/srv/app/.git"));
}

#[test]
fn bwrap_args_bind_writable_paths() {
    let (profile, layout, team) = profile();
    let args = profile.bwrap_args();
    let team_dir = layout.team_dir(team).display().to_string();
    assert!(args.windows(2).any(|w| w[0] == "--bind" && w[1] == team_dir));
    assert!(args.contains(&"--die-with-parent".to_string()));
}

#[test]
fn wrap_bash_preserves_command() {
    let (profile, _, _) = profile();
    let (_, args) = profile.wrap_bash("echo hello");
    assert_eq!(args.last().map(String::as_str), Some("echo hello"));
}

#[test]
fn runner_probe_matches_path_lookup() {
    let program = if cfg!(target_os = "macos") {
        "sandbox-exec"
    } else if cfg!(target_os = "linux") {
        "bwrap"
    } else {
        assert!(!sandbox_runner_available());
        return;
    };
    let on_path = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false);
    assert_eq!(sandbox_runner_available(), on_path);
}
