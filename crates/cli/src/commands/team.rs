// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dg team add|list|remove`.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use clap::Subcommand;
use dg_core::Layout;
use serde_json::json;

#[derive(Subcommand)]
pub enum TeamCommand {
    /// Create a team (seeds a manager agent)
    Add {
        name: String,
        /// Charter markdown file shared by every agent
        #[arg(long)]
        charter: Option<std::path::PathBuf>,
    },
    /// List teams
    List,
    /// Delete a team and everything it owns
    Remove { name: String },
}

pub async fn run(layout: &Layout, command: TeamCommand) -> Result<(), ExitError> {
    let client = DaemonClient::connect(layout)?;
    match command {
        TeamCommand::Add { name, charter } => {
            let charter = match charter {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .map_err(|e| ExitError::user(format!("charter {}: {e}", path.display())))?,
                ),
                None => None,
            };
            let team = client
                .post("/api/admin/teams", json!({"name": name, "charter": charter}))
                .await?;
            println!("created team {} ({})", team["name"], team["id"]);
        }
        TeamCommand::List => {
            let teams = client.get("/api/admin/teams").await?;
            let list = teams.as_array().cloned().unwrap_or_default();
            if list.is_empty() {
                println!("no teams");
            }
            for team in list {
                println!(
                    "{}  {}",
                    team["id"].as_str().unwrap_or("?"),
                    team["name"].as_str().unwrap_or("?")
                );
            }
        }
        TeamCommand::Remove { name } => {
            client.delete(&format!("/api/admin/teams/{name}")).await?;
            println!("removed team {name}");
        }
    }
    Ok(())
}
