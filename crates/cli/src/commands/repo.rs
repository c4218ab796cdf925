// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dg repo add|set-approval`.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use clap::Subcommand;
use dg_core::Layout;
use serde_json::json;

#[derive(Subcommand)]
pub enum RepoCommand {
    /// Register a git repository with a team
    Add {
        #[arg(long)]
        team: String,
        /// Display name, unique within the team
        name: String,
        /// Path to the repository root
        path: std::path::PathBuf,
        #[arg(long, default_value = "main")]
        target_branch: String,
        /// Command run inside the merge worktree before fast-forwarding
        #[arg(long)]
        premerge_cmd: Option<String>,
    },
    /// Set the merge approval policy (human | auto)
    SetApproval {
        #[arg(long)]
        team: String,
        name: String,
        policy: String,
    },
}

pub async fn run(layout: &Layout, command: RepoCommand) -> Result<(), ExitError> {
    let client = DaemonClient::connect(layout)?;
    match command {
        RepoCommand::Add { team, name, path, target_branch, premerge_cmd } => {
            let path = path
                .canonicalize()
                .map_err(|e| ExitError::user(format!("{}: {e}", path.display())))?;
            let repo = client
                .post(
                    &format!("/api/admin/teams/{team}/repos"),
                    json!({
                        "name": name,
                        "path": path.display().to_string(),
                        "target_branch": target_branch,
                        "premerge_cmd": premerge_cmd,
                    }),
                )
                .await?;
            println!("registered {} -> {}", repo["name"], repo["path"].as_str().unwrap_or("?"));
        }
        RepoCommand::SetApproval { team, name, policy } => {
            client
                .post(
                    &format!("/api/admin/teams/{team}/repos/{name}/approval"),
                    json!({"approval": policy}),
                )
                .await?;
            println!("{name}: approval = {policy}");
        }
    }
    Ok(())
}
