// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File listing and path completion inside a team's working directory.
//!
//! Serves the UI's attachment picker. Results are relative paths under the
//! team dir; the protected directory is never reachable from here.

use super::{ApiError, AppState};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::path::Path;

const MAX_RESULTS: usize = 500;

#[derive(Deserialize)]
pub struct FilesQuery {
    pub team: String,
    /// Prefix filter for completion.
    #[serde(default)]
    pub q: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let team = super::resolve_team(&state, &query.team)?;
    let root = state.layout.team_dir(team.id);
    let mut results = Vec::new();
    walk(&root, &root, &mut results);
    results.sort();
    results.truncate(MAX_RESULTS);
    Ok(Json(results))
}

pub async fn complete(
    State(state): State<AppState>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let team = super::resolve_team(&state, &query.team)?;
    let root = state.layout.team_dir(team.id);
    let mut results = Vec::new();
    walk(&root, &root, &mut results);
    results.retain(|p| p.starts_with(&query.q));
    results.sort();
    results.truncate(50);
    Ok(Json(results))
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
    if out.len() >= MAX_RESULTS {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        // Skip git plumbing and dotfiles.
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            walk(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.display().to_string());
        }
    }
}
