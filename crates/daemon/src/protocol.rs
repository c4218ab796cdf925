// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire DTOs for the HTTP surface. Entities serialize with their `dg-core`
//! shapes; this module only adds the envelope types.

use dg_core::{Agent, Message, Review, Task, Team, UsageTotals};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub config: ConfigDto,
    pub teams: Vec<Team>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_team: Option<TeamSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct ConfigDto {
    pub version: String,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct TeamSnapshot {
    pub team: Team,
    pub tasks: Vec<Task>,
    pub agents: Vec<Agent>,
    pub stats: TeamStats,
    pub messages: Vec<Message>,
}

#[derive(Debug, Default, Serialize)]
pub struct TeamStats {
    pub open_tasks: usize,
    pub done_tasks: usize,
    pub usage: UsageTotals,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub current: String,
    /// Highest version this daemon has heard of (upgrade hinting).
    pub latest_known: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub pid: u32,
    pub version: String,
    pub uptime_secs: u64,
    pub team_count: usize,
    pub turns_idle: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Serialize)]
pub struct TaskStats {
    pub usage: UsageTotals,
    pub review_attempts: usize,
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub repo: String,
    pub path: String,
    pub content: String,
    /// Head sha of the task branch in this repo at load time; echo it back
    /// in reviewer-edits.
    pub expected_sha: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewerEditsRequest {
    pub repo: String,
    pub expected_sha: String,
    pub files: Vec<ReviewerEditFile>,
    #[serde(default)]
    pub by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewerEditFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub by: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub by: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub team: String,
    pub from: String,
    pub to: String,
    pub body: String,
    #[serde(default)]
    pub task: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

// -- admin (CLI-only surface) --

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub charter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddAgentRequest {
    pub name: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AddRepoRequest {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub target_branch: Option<String>,
    #[serde(default)]
    pub premerge_cmd: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetApprovalRequest {
    pub approval: String,
}

#[derive(Debug, Deserialize)]
pub struct NetworkEditRequest {
    pub action: String,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NetworkResponse {
    pub allow: Vec<String>,
}
