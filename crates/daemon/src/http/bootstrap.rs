// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bootstrap, version, and status endpoints.

use super::{ApiError, AppState};
use crate::protocol::{
    BootstrapResponse, ConfigDto, StatusResponse, TeamSnapshot, TeamStats, VersionResponse,
};
use axum::extract::State;
use axum::Json;
use dg_storage::{messages, tasks, teams, usage, TaskFilter};

const BOOTSTRAP_MESSAGES: usize = 100;

/// Everything the UI needs in one round trip: config, the team list, and a
/// full snapshot of the first team.
pub async fn bootstrap(State(state): State<AppState>) -> Result<Json<BootstrapResponse>, ApiError> {
    let team_list = state.store.read(teams::list_teams)?;
    let initial_team = match team_list.first() {
        None => None,
        Some(team) => {
            let team = team.clone();
            let snapshot = state.store.read(|conn| {
                let all = tasks::list(
                    conn,
                    &TaskFilter { team: Some(team.id), include_terminal: true, ..Default::default() },
                )?;
                let agents = teams::list_agents(conn, team.id)?;
                let recent = messages::history(conn, team.id, BOOTSTRAP_MESSAGES)?;

                let mut stats = TeamStats::default();
                for task in &all {
                    if task.is_terminal() {
                        stats.done_tasks += 1;
                    } else {
                        stats.open_tasks += 1;
                    }
                }
                for agent in &agents {
                    let totals = usage::agent_totals(conn, team.id, agent.name.as_str())?;
                    stats.usage.merge(&totals);
                }
                Ok((all, agents, stats, recent))
            })?;
            let (task_list, agents, stats, recent) = snapshot;
            Some(TeamSnapshot { team, tasks: task_list, agents, stats, messages: recent })
        }
    };

    Ok(Json(BootstrapResponse {
        config: ConfigDto {
            version: env!("CARGO_PKG_VERSION").to_string(),
            port: state.config.port,
        },
        teams: team_list,
        initial_team,
    }))
}

pub async fn version(State(_state): State<AppState>) -> Json<VersionResponse> {
    let current = env!("CARGO_PKG_VERSION").to_string();
    Json(VersionResponse { latest_known: current.clone(), current })
}

pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let team_count = state.store.read(teams::list_teams)?.len();
    Ok(Json(StatusResponse {
        pid: std::process::id(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        team_count,
        turns_idle: state.scheduler.idle(),
    }))
}
