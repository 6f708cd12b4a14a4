// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crate::format::print_json;
use vigil_sdk::VigilClient;

#[derive(Subcommand)]
pub enum TagsCommand {
    /// List all tags
    List,

    /// Attach a tag to a host
    Add {
        /// Hostname to tag
        #[arg(value_name = "HOSTNAME")]
        hostname: String,

        /// Tag name
        #[arg(value_name = "TAG")]
        tag: String,
    },

    /// Detach a tag from a host
    Remove {
        /// Hostname to untag
        #[arg(value_name = "HOSTNAME")]
        hostname: String,

        /// Tag name
        #[arg(value_name = "TAG")]
        tag: String,
    },
}

pub async fn handle_command(command: TagsCommand, client: &VigilClient, json: bool) -> Result<()> {
    match command {
        TagsCommand::List => list_tags(client, json).await,
        TagsCommand::Add { hostname, tag } => {
            client.add_host_tag(&hostname, &tag).await?;
            println!("{}", format!("✓ Tag {tag} added to {hostname}").green());
            Ok(())
        }
        TagsCommand::Remove { hostname, tag } => {
            client.remove_host_tag(&hostname, &tag).await?;
            println!("{}", format!("✓ Tag {tag} removed from {hostname}").green());
            Ok(())
        }
    }
}

async fn list_tags(client: &VigilClient, json: bool) -> Result<()> {
    let response = client.list_tags().await?;

    if json {
        return print_json(&response.tags);
    }

    if response.tags.is_empty() {
        println!("{}", "No tags found".yellow());
        return Ok(());
    }

    for tag in &response.tags {
        println!("{}", tag.name);
    }

    Ok(())
}
