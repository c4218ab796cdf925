// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dg agent add`.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use clap::Subcommand;
use dg_core::Layout;
use serde_json::json;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Add an agent to a team
    Add {
        /// Team name or uuid
        #[arg(long)]
        team: String,
        name: String,
        /// manager | engineer | reviewer
        #[arg(long, default_value = "engineer")]
        role: String,
    },
}

pub async fn run(layout: &Layout, command: AgentCommand) -> Result<(), ExitError> {
    let client = DaemonClient::connect(layout)?;
    match command {
        AgentCommand::Add { team, name, role } => {
            let agent = client
                .post(
                    &format!("/api/admin/teams/{team}/agents"),
                    json!({"name": name, "role": role}),
                )
                .await?;
            println!("added {} ({}) to {team}", agent["name"], agent["role"]);
        }
    }
    Ok(())
}
