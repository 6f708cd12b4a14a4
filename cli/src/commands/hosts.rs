// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crate::format::{format_bytes, format_status, format_time, format_uptime, print_json};
use vigil_sdk::VigilClient;

#[derive(Subcommand)]
pub enum HostsCommand {
    /// List all hosts
    List,

    /// Get detailed information about a specific host
    Get {
        /// Hostname to look up
        #[arg(value_name = "HOSTNAME")]
        hostname: String,

        /// Number of usage records to fetch
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

pub async fn handle_command(command: HostsCommand, client: &VigilClient, json: bool) -> Result<()> {
    match command {
        HostsCommand::List => list_hosts(client, json).await,
        HostsCommand::Get { hostname, limit } => get_host(client, &hostname, limit, json).await,
    }
}

async fn list_hosts(client: &VigilClient, json: bool) -> Result<()> {
    let response = client.list_hosts().await?;

    if json {
        return print_json(&response.hosts);
    }

    if response.hosts.is_empty() {
        println!("{}", "No hosts found".yellow());
        return Ok(());
    }

    println!(
        "{:<24} {:<16} {:<8} {:>9} {:>10} {:>10}  {}",
        "HOSTNAME", "IP", "STATUS", "CPU CORES", "MEMORY", "STORAGE", "LAST SEEN"
    );

    for host in &response.hosts {
        let status = if host.online {
            format_status(true).green()
        } else {
            format_status(false).red()
        };

        println!(
            "{:<24} {:<16} {:<8} {:>9} {:>10} {:>10}  {}",
            host.hostname,
            host.ip,
            status,
            host.cpu_cores,
            format_bytes(host.total_memory_bytes),
            format_bytes(host.total_storage_bytes),
            format_time(&host.last_seen)
        );
    }

    Ok(())
}

async fn get_host(client: &VigilClient, hostname: &str, limit: usize, json: bool) -> Result<()> {
    let detail = client.get_host(hostname, limit).await?;

    if json {
        return print_json(&serde_json::json!({
            "host": detail.host,
            "usage": detail.usage,
            "tags": detail.tags,
        }));
    }

    let host = &detail.host;
    println!("Host: {}", host.hostname.bold());
    println!("IP: {}", host.ip);
    println!("Status: {}", format_status(host.online));
    println!("CPU Cores: {}", host.cpu_cores);
    println!("Total Memory: {}", format_bytes(host.total_memory_bytes));
    println!("Total Storage: {}", format_bytes(host.total_storage_bytes));
    println!("Uptime: {}", format_uptime(host.uptime_seconds));
    println!("Last Seen: {}", format_time(&host.last_seen));

    if !detail.tags.is_empty() {
        let names: Vec<&str> = detail.tags.iter().map(|t| t.name.as_str()).collect();
        println!("Tags: {}", names.join(", "));
    }
    println!();

    if detail.usage.is_empty() {
        println!("No usage data available");
        return Ok(());
    }

    println!("Recent Usage ({} records):", detail.usage.len());
    println!();
    println!(
        "{:<20} {:>7} {:>12} {:>13}",
        "TIMESTAMP", "CPU %", "MEMORY USED", "STORAGE USED"
    );

    for record in &detail.usage {
        println!(
            "{:<20} {:>6.1}% {:>12} {:>13}",
            format_time(&record.timestamp),
            record.cpu_percent,
            format_bytes(record.used_memory_bytes),
            format_bytes(record.used_storage_bytes)
        );
    }

    Ok(())
}
