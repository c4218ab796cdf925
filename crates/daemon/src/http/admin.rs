// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative endpoints, used only by the CLI. None of these are
//! reachable from agent tool calls.

use super::{ApiError, AppState};
use crate::protocol::{
    AddAgentRequest, AddRepoRequest, CreateTeamRequest, NetworkEditRequest, NetworkResponse,
    SetApprovalRequest,
};
use crate::{teamfs, workflows};
use axum::extract::{Path as AxumPath, State};
use axum::Json;
use dg_core::{
    Agent, AgentName, ApprovalPolicy, Clock, Event, RepoConfig, RepoName, Role, RotationReason,
    Team,
};
use dg_sandbox::NetworkAllowlist;
use dg_storage::teams;

pub async fn list_teams(State(state): State<AppState>) -> Result<Json<Vec<Team>>, ApiError> {
    Ok(Json(state.store.read(teams::list_teams)?))
}

/// Create a team: DB row, directory scaffold, and a seeded manager agent.
pub async fn create_team(
    State(state): State<AppState>,
    Json(body): Json<CreateTeamRequest>,
) -> Result<Json<Team>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("team name is empty"));
    }
    let mut team = Team::new(body.name.trim(), state.ctx.clock.epoch_ms());
    if let Some(charter) = body.charter {
        team.charter = charter;
    }
    let manager = Agent::new(
        team.id,
        AgentName::parse("manager").map_err(|e| ApiError::bad_request(e.to_string()))?,
        Role::Manager,
        team.created_at_ms,
    );

    let created = team.clone();
    state.ctx.commit(move |tx| {
        teams::insert_team(tx.conn(), &team)?;
        teams::insert_agent(tx.conn(), &manager)?;
        tx.emit(team.id, Event::TeamCreated { team: team.id, name: team.name.clone() })?;
        tx.emit(
            team.id,
            Event::AgentAdded {
                team: team.id,
                name: "manager".to_string(),
                role: Role::Manager.to_string(),
            },
        )?;
        Ok(())
    })?;

    teamfs::scaffold_team(&state.layout, &created)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    teamfs::scaffold_agent(
        &state.layout,
        created.id,
        &AgentName::parse("manager").map_err(|e| ApiError::bad_request(e.to_string()))?,
    )
    .map_err(|e| ApiError::bad_request(e.to_string()))?;
    sync_team_ids(&state)?;

    Ok(Json(created))
}

/// Destroy a team: cancel its turns, drop DB rows (cascading), and tear
/// down the working directory.
pub async fn delete_team(
    State(state): State<AppState>,
    AxumPath(team): AxumPath<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let team = super::resolve_team(&state, &team)?;
    state.scheduler.cancel_team(team.id);
    state.sessions.rotate_all(RotationReason::SandboxConfigChanged).await;

    state.ctx.commit(|tx| {
        tx.emit(team.id, Event::TeamRemoved { team: team.id })?;
        teams::delete_team(tx.conn(), team.id)?;
        Ok(())
    })?;
    if let Err(e) = teamfs::remove_team_dir(&state.layout, team.id) {
        tracing::warn!(team = %team.name, error = %e, "team dir teardown incomplete");
    }
    sync_team_ids(&state)?;
    Ok(Json(serde_json::json!({"removed": team.id.to_string()})))
}

pub async fn add_agent(
    State(state): State<AppState>,
    AxumPath(team): AxumPath<String>,
    Json(body): Json<AddAgentRequest>,
) -> Result<Json<Agent>, ApiError> {
    let team = super::resolve_team(&state, &team)?;
    let name = AgentName::parse(&body.name).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let role = Role::parse(&body.role)
        .ok_or_else(|| ApiError::bad_request(format!("unknown role {:?}", body.role)))?;
    let agent = Agent::new(team.id, name.clone(), role, state.ctx.clock.epoch_ms());

    let created = agent.clone();
    state.ctx.commit(move |tx| {
        teams::insert_agent(tx.conn(), &agent)?;
        tx.emit(
            team.id,
            Event::AgentAdded { team: team.id, name: name.to_string(), role: role.to_string() },
        )?;
        Ok(())
    })?;
    teamfs::scaffold_agent(&state.layout, created.team, &created.name)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(created))
}

/// Register (or re-register) a repo. Active sessions pick the new sandbox
/// config up through the fingerprint check on their next turn.
pub async fn add_repo(
    State(state): State<AppState>,
    AxumPath(team): AxumPath<String>,
    Json(body): Json<AddRepoRequest>,
) -> Result<Json<RepoConfig>, ApiError> {
    let team = super::resolve_team(&state, &team)?;
    let path = std::path::PathBuf::from(&body.path);
    if !path.join(".git").exists() {
        return Err(ApiError::bad_request(format!("{} is not a git repository", body.path)));
    }
    let mut repo = RepoConfig::new(body.name.as_str(), path);
    if let Some(branch) = body.target_branch {
        repo = repo.target_branch(branch);
    }
    if let Some(cmd) = body.premerge_cmd {
        repo = repo.premerge_cmd(cmd);
    }

    let team_id = team.id;
    let stored = repo.clone();
    state.ctx.commit(move |tx| teams::insert_repo(tx.conn(), team_id, &repo))?;
    teamfs::link_repo(&state.layout, team_id, &stored)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    // Re-registration changes the sandbox writable set: cancel the team's
    // in-flight turns; sessions re-derive their config on the next turn.
    state.scheduler.cancel_team(team_id);
    Ok(Json(stored))
}

pub async fn set_approval(
    State(state): State<AppState>,
    AxumPath((team, repo)): AxumPath<(String, String)>,
    Json(body): Json<SetApprovalRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let team = super::resolve_team(&state, &team)?;
    let approval = ApprovalPolicy::parse(&body.approval)
        .ok_or_else(|| ApiError::bad_request(format!("unknown policy {:?}", body.approval)))?;
    let name = RepoName::from(repo.as_str());
    let updated = state
        .ctx
        .commit(|tx| teams::set_repo_approval(tx.conn(), team.id, &name, approval))?;
    if !updated {
        return Err(ApiError::not_found(format!("repo {repo:?}")));
    }
    Ok(Json(serde_json::json!({"repo": repo, "approval": approval.to_string()})))
}

/// Register a workflow definition file for a team.
pub async fn add_workflow(
    State(state): State<AppState>,
    AxumPath(team): AxumPath<String>,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let team = super::resolve_team(&state, &team)?;
    let spec =
        workflows::WorkflowSpec::parse(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let workflow = spec.build().map_err(|e| ApiError::bad_request(e.to_string()))?;
    let reference = state.registry.register(workflow);

    // Persist so restarts reload it.
    let dir = state.layout.workflows_dir(team.id);
    std::fs::create_dir_all(&dir).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let path = dir.join(format!("{}-v{}.toml", spec.name, spec.version));
    std::fs::write(&path, &body).map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(Json(serde_json::json!({"registered": reference.to_string()})))
}

pub async fn show_network(State(state): State<AppState>) -> Result<Json<NetworkResponse>, ApiError> {
    let list = NetworkAllowlist::load_or_init(&state.layout.network_path())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(NetworkResponse { allow: list.allow }))
}

/// Edit the egress allowlist. Every active session rotates so the OS
/// sandbox config is re-derived.
pub async fn edit_network(
    State(state): State<AppState>,
    Json(body): Json<NetworkEditRequest>,
) -> Result<Json<NetworkResponse>, ApiError> {
    let path = state.layout.network_path();
    let mut list = NetworkAllowlist::load_or_init(&path)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    match (body.action.as_str(), body.domain.as_deref()) {
        ("allow", Some(domain)) => {
            list.allow_domain(domain);
        }
        ("disallow", Some(domain)) => {
            list.disallow_domain(domain);
        }
        ("reset", _) => list = NetworkAllowlist::default(),
        (action, _) => {
            return Err(ApiError::bad_request(format!("unknown network action {action:?}")))
        }
    }
    list.save(&path).map_err(|e| ApiError::bad_request(e.to_string()))?;

    state.sessions.rotate_all(RotationReason::SandboxConfigChanged).await;

    let domains = list.allow.clone();
    let teams_list = state.store.read(teams::list_teams)?;
    for team in teams_list {
        let domains = domains.clone();
        let _ = state.ctx.commit(move |tx| {
            tx.emit(team.id, Event::NetworkUpdated { domains })?;
            Ok(())
        });
    }

    Ok(Json(NetworkResponse { allow: list.allow }))
}

pub async fn shutdown(State(state): State<AppState>) -> Json<serde_json::Value> {
    let state = std::sync::Arc::clone(&state);
    tokio::spawn(async move {
        crate::lifecycle::shutdown(&state).await;
        std::process::exit(0);
    });
    Json(serde_json::json!({"stopping": true}))
}

fn sync_team_ids(state: &AppState) -> Result<(), ApiError> {
    let list = state.store.read(teams::list_teams)?;
    teamfs::write_team_ids(&state.layout, &list).map_err(|e| ApiError::bad_request(e.to_string()))
}
