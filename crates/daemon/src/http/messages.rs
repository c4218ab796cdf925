// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messaging endpoints.

use super::{ApiError, AppState};
use crate::protocol::PostMessageRequest;
use axum::extract::{Path as AxumPath, Query, State};
use axum::Json;
use dg_core::{Event, Message, MessageKind, Sender, TaskId};
use dg_storage::messages;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    200
}

pub async fn history(
    State(state): State<AppState>,
    AxumPath(team): AxumPath<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let team = super::resolve_team(&state, &team)?;
    let list = state.store.read(|conn| messages::history(conn, team.id, query.limit))?;
    Ok(Json(list))
}

/// Post a message from a human into an agent's mailbox. The sender is a
/// member name; human messages always form exclusive turn batches.
pub async fn post_message(
    State(state): State<AppState>,
    Json(body): Json<PostMessageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let team = super::resolve_team(&state, &body.team)?;
    if body.body.trim().is_empty() {
        return Err(ApiError::bad_request("message body is empty"));
    }
    // First contact registers the member identity.
    if let Err(e) = crate::members::register(&state.layout, &body.from) {
        tracing::warn!(from = %body.from, error = %e, "member registration failed");
    }
    let sender = Sender::Human(body.from.clone());
    let task = body.task.map(TaskId);
    let message = state.ctx.commit(|tx| {
        let message = messages::insert(
            tx.conn(),
            team.id,
            &sender,
            &body.to,
            MessageKind::Chat,
            &body.body,
            task,
            tx.now_ms(),
        )?;
        tx.emit(
            team.id,
            Event::MessageSent {
                message: message.id,
                sender: sender.clone(),
                recipient: body.to.clone(),
                kind: MessageKind::Chat,
                task,
            },
        )?;
        Ok(message)
    })?;
    Ok(Json(serde_json::json!({"message_id": message.id.0})))
}

/// Ask the team's manager to introduce the team (first-run experience).
pub async fn greet(
    State(state): State<AppState>,
    AxumPath(team): AxumPath<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let team = super::resolve_team(&state, &team)?;
    let manager = state
        .store
        .read(|conn| dg_storage::teams::list_agents(conn, team.id))?
        .into_iter()
        .find(|a| a.role == dg_core::Role::Manager)
        .ok_or_else(|| ApiError::not_found("manager agent"))?;

    state.ctx.commit(|tx| {
        let message = messages::insert(
            tx.conn(),
            team.id,
            &Sender::Daemon,
            manager.name.as_str(),
            MessageKind::Event,
            "A human just connected. Introduce the team and summarize what everyone is working on.",
            None,
            tx.now_ms(),
        )?;
        tx.emit(
            team.id,
            Event::MessageSent {
                message: message.id,
                sender: Sender::Daemon,
                recipient: manager.name.to_string(),
                kind: MessageKind::Event,
                task: None,
            },
        )?;
        Ok(())
    })?;
    Ok(Json(serde_json::json!({"greeted": true})))
}
