// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP surface.
//!
//! Handlers are registered under both the `/api/...` prefix and the
//! historical flat paths (`/teams/...`, `/stream`): one handler per
//! operation, two routes where compatibility requires it.

mod admin;
mod bootstrap;
mod files;
mod messages;
mod stream;
mod tasks;

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

use crate::lifecycle::DaemonHandle;
use crate::protocol::ErrorBody;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub type AppState = Arc<DaemonHandle>;

pub fn router(state: AppState) -> Router {
    Router::new()
        // bootstrap & meta
        .route("/api/bootstrap", get(bootstrap::bootstrap))
        .route("/api/version", get(bootstrap::version))
        .route("/api/status", get(bootstrap::status))
        // tasks
        .route("/api/tasks", get(tasks::list))
        .route("/api/tasks/{id}", get(tasks::show))
        .route("/api/tasks/{id}/stats", get(tasks::stats))
        .route("/api/tasks/{id}/diff", get(tasks::diff))
        .route("/api/tasks/{id}/file", get(tasks::file))
        .route("/api/tasks/{id}/reviewer-edits", post(tasks::reviewer_edits))
        .route("/api/tasks/{id}/approve", post(tasks::approve))
        .route("/api/tasks/{id}/reject", post(tasks::reject))
        .route("/api/tasks/{id}/retry-merge", post(tasks::retry_merge))
        // compat: flat task routes
        .route("/tasks", get(tasks::list))
        .route("/tasks/{id}", get(tasks::show))
        // messaging
        .route("/teams/{team}/messages", get(messages::history))
        .route("/api/teams/{team}/messages", get(messages::history))
        .route("/messages", post(messages::post_message))
        .route("/api/messages", post(messages::post_message))
        .route("/teams/{team}/greet", post(messages::greet))
        .route("/api/teams/{team}/greet", post(messages::greet))
        // files
        .route("/api/files/complete", get(files::complete))
        .route("/api/files/list", get(files::list))
        // live stream
        .route("/stream", get(stream::stream))
        .route("/api/stream", get(stream::stream))
        // admin (CLI-only; not exposed to agents)
        .route("/api/admin/teams", post(admin::create_team).get(admin::list_teams))
        .route("/api/admin/teams/{team}", axum::routing::delete(admin::delete_team))
        .route("/api/admin/teams/{team}/agents", post(admin::add_agent))
        .route("/api/admin/teams/{team}/repos", post(admin::add_repo))
        .route("/api/admin/teams/{team}/repos/{repo}/approval", post(admin::set_approval))
        .route("/api/admin/teams/{team}/workflows", post(admin::add_workflow))
        .route("/api/admin/network", get(admin::show_network).post(admin::edit_network))
        .route("/api/admin/shutdown", post(admin::shutdown))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Uniform error mapping: user errors are 4xx with a stable code, the rest
/// 500 with a one-liner. Never leaks internals beyond the message.
pub(crate) struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found".into(),
            message: format!("{what} not found"),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code: "bad_argument".into(), message: message.into() }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status: StatusCode::CONFLICT, code: code.into(), message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody { error: self.message, code: self.code });
        (self.status, body).into_response()
    }
}

impl From<dg_storage::StorageError> for ApiError {
    fn from(e: dg_storage::StorageError) -> Self {
        match e {
            dg_storage::StorageError::User(user) => Self {
                status: StatusCode::BAD_REQUEST,
                code: user.code.to_string(),
                message: user.message,
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: other.kind().to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<dg_engine::EngineError> for ApiError {
    fn from(e: dg_engine::EngineError) -> Self {
        match e {
            dg_engine::EngineError::User(user) => Self {
                status: StatusCode::BAD_REQUEST,
                code: user.code.to_string(),
                message: user.message,
            },
            dg_engine::EngineError::Storage(inner) => inner.into(),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: other.kind().to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Resolve a team from either its uuid or its display name.
pub(crate) fn resolve_team(
    state: &AppState,
    key: &str,
) -> Result<dg_core::Team, ApiError> {
    let team = state.store.read(|conn| {
        if let Some(id) = dg_core::TeamId::parse(key) {
            return dg_storage::teams::get_team(conn, id);
        }
        dg_storage::teams::team_by_name(conn, key)
    })?;
    team.ok_or_else(|| ApiError::not_found(format!("team {key:?}")))
}
