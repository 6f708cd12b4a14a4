// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crate::format::{format_time, print_json};
use vigil_sdk::{CreateScriptRequest, VigilClient};

#[derive(Subcommand)]
pub enum ScriptsCommand {
    /// List all scripts
    List,

    /// Create a script and push it to the selected hosts
    Create {
        /// Script name
        #[arg(short, long)]
        name: String,

        /// Path to the shell script file
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Target hosts carrying any of these tags (default: all hosts)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Show a script and its executions
    Get {
        /// Script ID
        #[arg(value_name = "SCRIPT_ID")]
        id: String,
    },

    /// Delete a script and its execution history
    Delete {
        /// Script ID
        #[arg(value_name = "SCRIPT_ID")]
        id: String,
    },
}

pub async fn handle_command(
    command: ScriptsCommand,
    client: &VigilClient,
    json: bool,
) -> Result<()> {
    match command {
        ScriptsCommand::List => list_scripts(client, json).await,
        ScriptsCommand::Create { name, file, tags } => {
            create_script(client, name, file, tags, json).await
        }
        ScriptsCommand::Get { id } => get_script(client, &id, json).await,
        ScriptsCommand::Delete { id } => delete_script(client, &id).await,
    }
}

async fn list_scripts(client: &VigilClient, json: bool) -> Result<()> {
    let response = client.list_scripts().await?;

    if json {
        return print_json(&response.scripts);
    }

    if response.scripts.is_empty() {
        println!("{}", "No scripts found".yellow());
        return Ok(());
    }

    println!("{:<38} {:<24} {:<20} {}", "ID", "NAME", "CREATED", "SHA256");
    for script in &response.scripts {
        println!(
            "{:<38} {:<24} {:<20} {}",
            script.id,
            script.name.bold(),
            format_time(&script.created_at),
            &script.sha256_hash[..12]
        );
    }

    Ok(())
}

async fn create_script(
    client: &VigilClient,
    name: String,
    file: PathBuf,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read script file: {file:?}"))?;

    let script = client
        .create_script(&CreateScriptRequest {
            name,
            content,
            tags: tags.clone(),
        })
        .await?;

    if json {
        return print_json(&script);
    }

    let target = if tags.is_empty() {
        "all hosts".to_string()
    } else {
        format!("hosts tagged {}", tags.join(", "))
    };
    println!(
        "{}",
        format!("✓ Script {} created, distributing to {target}", script.id).green()
    );

    Ok(())
}

async fn get_script(client: &VigilClient, id: &str, json: bool) -> Result<()> {
    let detail = client.get_script(id).await?;

    if json {
        return print_json(&serde_json::json!({
            "script": detail.script,
            "executions": detail.executions,
        }));
    }

    let script = &detail.script;
    println!("Script: {}", script.name.bold());
    println!("ID: {}", script.id);
    println!("SHA256: {}", script.sha256_hash);
    println!("Created: {}", format_time(&script.created_at));
    println!();
    println!("{}", script.content);

    if detail.executions.is_empty() {
        println!("No executions recorded");
        return Ok(());
    }

    println!("Executions ({}):", detail.executions.len());
    println!();
    println!("{:<24} {:>9}  {}", "HOST", "EXIT CODE", "EXECUTED AT");
    for execution in &detail.executions {
        let exit = if execution.exit_code == 0 {
            execution.exit_code.to_string().green()
        } else {
            execution.exit_code.to_string().red()
        };
        println!(
            "{:<24} {:>9}  {}",
            execution.hostname.as_deref().unwrap_or("-"),
            exit,
            format_time(&execution.executed_at)
        );
    }

    Ok(())
}

async fn delete_script(client: &VigilClient, id: &str) -> Result<()> {
    client.delete_script(id).await?;
    println!("{}", format!("✓ Script {id} deleted").green());
    Ok(())
}
