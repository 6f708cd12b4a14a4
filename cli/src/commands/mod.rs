// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod hosts;
pub mod scripts;
pub mod tags;

pub use hosts::HostsCommand;
pub use scripts::ScriptsCommand;
pub use tags::TagsCommand;

use anyhow::Result;
use colored::Colorize;

use crate::format::{format_bytes, print_json};
use vigil_sdk::VigilClient;

pub async fn health(client: &VigilClient, json: bool) -> Result<()> {
    let health = client.health().await?;

    if json {
        return print_json(&serde_json::json!({
            "status": health.status,
            "database": health.database,
        }));
    }

    let status = if health.status == "healthy" {
        health.status.green()
    } else {
        health.status.red()
    };
    println!("Status: {status}");
    println!("Database: {}", health.database);
    Ok(())
}

pub async fn stats(client: &VigilClient, json: bool) -> Result<()> {
    let stats = client.stats().await?;

    if json {
        return print_json(&stats);
    }

    println!("Cluster Statistics:");
    println!();
    println!("Total Hosts:        {}", stats.total_hosts);
    println!("Online Hosts:       {}", stats.online_hosts.to_string().green());
    println!("Offline Hosts:      {}", stats.offline_hosts.to_string().red());
    println!("Total CPU Cores:    {}", stats.total_cpu_cores);
    println!("Total Memory:       {}", format_bytes(stats.total_memory_bytes));
    println!("Total Storage:      {}", format_bytes(stats.total_storage_bytes));
    println!("Avg CPU (5 min):    {:.1}%", stats.avg_cpu_percent);
    Ok(())
}
