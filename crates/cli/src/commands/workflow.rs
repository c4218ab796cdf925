// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dg workflow init|add`.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use clap::Subcommand;
use dg_core::Layout;

#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// Write a workflow definition template to edit
    Init {
        /// Output path (default: ./workflow.toml)
        #[arg(default_value = "workflow.toml")]
        path: std::path::PathBuf,
    },
    /// Register a workflow definition file with a team
    Add {
        #[arg(long)]
        team: String,
        path: std::path::PathBuf,
    },
}

pub async fn run(layout: &Layout, command: WorkflowCommand) -> Result<(), ExitError> {
    match command {
        WorkflowCommand::Init { path } => {
            if path.exists() {
                return Err(ExitError::user(format!("{} already exists", path.display())));
            }
            std::fs::write(&path, dg_daemon::workflows::template())
                .map_err(|e| ExitError::internal(e.to_string()))?;
            println!("wrote {}", path.display());
            Ok(())
        }
        WorkflowCommand::Add { team, path } => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ExitError::user(format!("{}: {e}", path.display())))?;
            let client = DaemonClient::connect(layout)?;
            let result =
                client.post_text(&format!("/api/admin/teams/{team}/workflows"), text).await?;
            println!("registered {}", result["registered"].as_str().unwrap_or("workflow"));
            Ok(())
        }
    }
}
