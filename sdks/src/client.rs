// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{bail, Result};
use reqwest::{Client, StatusCode};

use crate::types::{
    ClusterStats, CreateScriptRequest, Health, HostDetail, HostsResponse, Script, ScriptDetail,
    ScriptsResponse, TagsResponse,
};

/// Client for interacting with the vigil controller API.
pub struct VigilClient {
    base_url: String,
    client: Client,
}

impl VigilClient {
    /// Create a new client against a base URL such as `http://host:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub async fn health(&self) -> Result<Health> {
        let url = format!("{}/api/v1/health", self.base_url);
        let health = self.client.get(&url).send().await?.json().await?;
        Ok(health)
    }

    pub async fn list_hosts(&self) -> Result<HostsResponse> {
        let url = format!("{}/api/v1/hosts", self.base_url);
        let hosts = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(hosts)
    }

    pub async fn get_host(&self, hostname: &str, limit: usize) -> Result<HostDetail> {
        let url = format!("{}/api/v1/hosts/{hostname}?limit={limit}", self.base_url);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            bail!("Host {hostname} not found");
        }

        let detail = response.error_for_status()?.json().await?;
        Ok(detail)
    }

    pub async fn stats(&self) -> Result<ClusterStats> {
        let url = format!("{}/api/v1/stats", self.base_url);
        let stats = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(stats)
    }

    pub async fn list_scripts(&self) -> Result<ScriptsResponse> {
        let url = format!("{}/api/v1/scripts", self.base_url);
        let scripts = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(scripts)
    }

    /// Create a script and trigger its distribution to the tagged hosts
    /// (or the whole fleet when `tags` is empty).
    pub async fn create_script(&self, request: &CreateScriptRequest) -> Result<Script> {
        let url = format!("{}/api/v1/scripts", self.base_url);
        let script = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(script)
    }

    pub async fn get_script(&self, id: &str) -> Result<ScriptDetail> {
        let url = format!("{}/api/v1/scripts/{id}", self.base_url);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            bail!("Script {id} not found");
        }

        let detail = response.error_for_status()?.json().await?;
        Ok(detail)
    }

    pub async fn delete_script(&self, id: &str) -> Result<()> {
        let url = format!("{}/api/v1/scripts/{id}", self.base_url);
        self.client
            .delete(&url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn list_tags(&self) -> Result<TagsResponse> {
        let url = format!("{}/api/v1/tags", self.base_url);
        let tags = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(tags)
    }

    pub async fn add_host_tag(&self, hostname: &str, tag: &str) -> Result<()> {
        let url = format!("{}/api/v1/hosts/tags", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "hostname": hostname, "tag": tag }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            bail!("Host {hostname} not found");
        }

        response.error_for_status()?;
        Ok(())
    }

    pub async fn remove_host_tag(&self, hostname: &str, tag: &str) -> Result<()> {
        let url = format!("{}/api/v1/hosts/tags", self.base_url);
        self.client
            .delete(&url)
            .json(&serde_json::json!({ "hostname": hostname, "tag": tag }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
