// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The SSE stream: replay from `last_seen_sequence`, then live tail.
//!
//! One shared connection per browser is fine; the server does not care how
//! many tabs multiplex over it.

use super::{ApiError, AppState};
use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use dg_core::EventEnvelope;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

const REPLAY_CHUNK: usize = 500;

#[derive(Deserialize)]
pub struct StreamQuery {
    pub team: String,
    /// Team sequence of the last event the client saw; 0 for "from now".
    #[serde(default)]
    pub after: i64,
    /// Optional comma-separated event-kind filter (e.g. `task:stage,turn:delta`).
    #[serde(default)]
    pub kinds: Option<String>,
}

pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let team = super::resolve_team(&state, &query.team)?;
    let kinds: Option<Vec<String>> = query
        .kinds
        .map(|k| k.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect());

    // Subscribe BEFORE replay so nothing falls between the two phases;
    // duplicates across the seam are filtered by sequence below.
    let live = state.bus.subscribe();

    let mut backlog: Vec<EventEnvelope> = Vec::new();
    let mut cursor = query.after;
    loop {
        let chunk = state.bus.replay(team.id, cursor, REPLAY_CHUNK)?;
        let done = chunk.len() < REPLAY_CHUNK;
        if let Some(last) = chunk.last() {
            cursor = last.team_seq;
        }
        backlog.extend(chunk);
        if done {
            break;
        }
    }
    let resume_from = cursor;

    let team_id = team.id;
    let kinds_live = kinds.clone();
    let replay_stream = tokio_stream::iter(backlog.into_iter().filter_map(move |envelope| {
        if !kind_allowed(&kinds, &envelope) {
            return None;
        }
        Some(Ok(to_sse(&envelope)))
    }));

    let live_stream = BroadcastStream::new(live).filter_map(move |item| match item {
        Ok(envelope)
            if envelope.team == team_id
                && envelope.team_seq > resume_from
                && kind_allowed(&kinds_live, &envelope) =>
        {
            Some(Ok(to_sse(&envelope)))
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            // The client fell behind the live buffer; tell it to reconnect
            // with its cursor so it replays from the log.
            Some(Ok(SseEvent::default().event("lagged").data(n.to_string())))
        }
    });

    Ok(Sse::new(replay_stream.chain(live_stream)).keep_alive(KeepAlive::default()))
}

fn kind_allowed(kinds: &Option<Vec<String>>, envelope: &EventEnvelope) -> bool {
    match kinds {
        None => true,
        Some(list) => list.iter().any(|k| k == envelope.event.kind()),
    }
}

fn to_sse(envelope: &EventEnvelope) -> SseEvent {
    let data = serde_json::to_string(envelope).unwrap_or_else(|_| "{}".to_string());
    SseEvent::default().event(envelope.event.kind()).id(envelope.team_seq.to_string()).data(data)
}
