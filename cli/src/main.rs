// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Vigil Operator CLI
//!
//! Command-line interface for the vigil controller API: query hosts, usage
//! and cluster statistics, manage tags, and push scripts to the fleet.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod format;

use commands::{HostsCommand, ScriptsCommand, TagsCommand};
use vigil_sdk::VigilClient;

/// Vigil - fleet telemetry and remote execution
#[derive(Parser)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Controller API base URL
    #[arg(
        short,
        long,
        global = true,
        env = "CONTROLLER_URL",
        default_value = "http://localhost:8080"
    )]
    server: String,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check controller service health
    Health,

    /// Manage and query hosts
    Hosts {
        #[command(subcommand)]
        command: HostsCommand,
    },

    /// Get cluster-wide statistics
    Stats,

    /// Manage scripts and their executions
    Scripts {
        #[command(subcommand)]
        command: ScriptsCommand,
    },

    /// Manage host tags
    Tags {
        #[command(subcommand)]
        command: TagsCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = VigilClient::new(&cli.server);

    match cli.command {
        Commands::Health => commands::health(&client, cli.json).await,
        Commands::Hosts { command } => commands::hosts::handle_command(command, &client, cli.json).await,
        Commands::Stats => commands::stats(&client, cli.json).await,
        Commands::Scripts { command } => {
            commands::scripts::handle_command(command, &client, cli.json).await
        }
        Commands::Tags { command } => commands::tags::handle_command(command, &client, cli.json).await,
    }
}
