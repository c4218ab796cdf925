// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dg network show|allow|disallow|reset`.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use clap::Subcommand;
use dg_core::Layout;
use serde_json::json;

#[derive(Subcommand)]
pub enum NetworkCommand {
    /// Show the egress allowlist
    Show,
    /// Allow a domain
    Allow { domain: String },
    /// Remove a domain
    Disallow { domain: String },
    /// Reset to the default allowlist
    Reset,
}

pub async fn run(layout: &Layout, command: NetworkCommand) -> Result<(), ExitError> {
    let client = DaemonClient::connect(layout)?;
    let result = match command {
        NetworkCommand::Show => client.get("/api/admin/network").await?,
        NetworkCommand::Allow { domain } => {
            client.post("/api/admin/network", json!({"action": "allow", "domain": domain})).await?
        }
        NetworkCommand::Disallow { domain } => {
            client
                .post("/api/admin/network", json!({"action": "disallow", "domain": domain}))
                .await?
        }
        NetworkCommand::Reset => {
            client.post("/api/admin/network", json!({"action": "reset"})).await?
        }
    };
    for domain in result["allow"].as_array().cloned().unwrap_or_default() {
        println!("{}", domain.as_str().unwrap_or("?"));
    }
    Ok(())
}
