// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dg`, the Delegate CLI.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use dg_core::Layout;
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "dg", about = "Delegate: a persistent team of AI coding agents", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon
    Start {
        /// Run in the foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Check daemon status
    Status,
    /// Team management
    Team {
        #[command(subcommand)]
        command: commands::team::TeamCommand,
    },
    /// Agent management
    Agent {
        #[command(subcommand)]
        command: commands::agent::AgentCommand,
    },
    /// Repository registration
    Repo {
        #[command(subcommand)]
        command: commands::repo::RepoCommand,
    },
    /// Workflow definitions
    Workflow {
        #[command(subcommand)]
        command: commands::workflow::WorkflowCommand,
    },
    /// Egress allowlist
    Network {
        #[command(subcommand)]
        command: commands::network::NetworkCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let layout = Layout::discover();

    let result = match cli.command {
        Command::Start { foreground } => commands::daemon_cmd::start(&layout, foreground).await,
        Command::Stop => commands::daemon_cmd::stop(&layout).await,
        Command::Status => commands::daemon_cmd::status(&layout).await,
        Command::Team { command } => commands::team::run(&layout, command).await,
        Command::Agent { command } => commands::agent::run(&layout, command).await,
        Command::Repo { command } => commands::repo::run(&layout, command).await,
        Command::Workflow { command } => commands::workflow::run(&layout, command).await,
        Command::Network { command } => commands::network::run(&layout, command).await,
    };

    if let Err(e) = result {
        eprintln!("dg: {e}");
        std::process::exit(e.code);
    }
}
