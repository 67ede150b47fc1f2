use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::config::AuditConfig;

/// Outbound call profiles. Each gets its own timeout; none of them retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    /// Primary page fetch
    Page,
    /// robots.txt / sitemap.xml probes
    Probe,
    /// Performance API
    PageSpeed,
    /// AI recommendation API
    Ai,
}

impl ClientType {
    pub fn timeout(&self, config: &AuditConfig) -> Duration {
        match self {
            ClientType::Page => config.fetch_timeout,
            ClientType::Probe => config.probe_timeout,
            ClientType::PageSpeed => config.pagespeed_timeout,
            ClientType::Ai => config.ai_timeout,
        }
    }
}

/// Factory for creating an HTTP client for the given call profile.
pub fn create_client(client_type: ClientType, config: &AuditConfig) -> Result<Client> {
    Client::builder()
        .timeout(client_type.timeout(config))
        .user_agent(config.user_agent.as_str())
        .build()
        .with_context(|| format!("Failed to build {:?} HTTP client", client_type))
}
