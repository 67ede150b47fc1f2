//! Page fetching and site resource probing.

use anyhow::Result;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::AuditConfig;
use crate::domain::models::{ResourceStatus, TechnicalFlags};
use crate::error::AppError;
use crate::service::http::{create_client, ClientType};

/// Retrieves the audited page and probes `/robots.txt` and `/sitemap.xml`.
///
/// Page fetches fail loudly; probes never fail at all. Neither retries.
pub struct PageFetcher {
    page_client: Client,
    probe_client: Client,
}

impl PageFetcher {
    pub fn new(config: &AuditConfig) -> Result<Self> {
        Ok(Self {
            page_client: create_client(ClientType::Page, config)?,
            probe_client: create_client(ClientType::Probe, config)?,
        })
    }

    /// GET the page body. Any transport error or non-2xx status is a
    /// `AppError::Fetch`.
    pub async fn fetch(&self, url: &Url) -> crate::error::Result<String> {
        log::info!("[FETCH] Fetching {}", url);

        let response = self
            .page_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AppError::fetch(url.as_str(), describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("[FETCH] {} returned {}", url, status);
            return Err(AppError::fetch(url.as_str(), format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::fetch(url.as_str(), format!("failed to read body: {}", e)))?;

        log::debug!("[FETCH] Received {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Check robots.txt exists
    pub async fn check_robots(&self, url: &Url) -> bool {
        log::debug!("[RESOURCE] Checking robots.txt for {}", url);
        self.probe(url, "/robots.txt").await
    }

    /// Check sitemap.xml exists
    pub async fn check_sitemap(&self, url: &Url) -> bool {
        log::debug!("[RESOURCE] Checking sitemap.xml for {}", url);
        self.probe(url, "/sitemap.xml").await
    }

    /// Run both probes concurrently.
    pub async fn check_technical(&self, url: &Url) -> TechnicalFlags {
        let (has_robots_txt, has_sitemap) =
            tokio::join!(self.check_robots(url), self.check_sitemap(url));

        TechnicalFlags {
            has_robots_txt,
            has_sitemap,
        }
    }

    async fn probe(&self, url: &Url, path: &str) -> bool {
        match self.check_resource(url, path).await {
            Ok(status) => status.is_found(),
            Err(e) => {
                log::debug!("[RESOURCE] Probe {} for {} failed: {:#}", path, url, e);
                false
            }
        }
    }

    async fn check_resource(&self, base_url: &Url, path: &str) -> Result<ResourceStatus> {
        let resource_url = base_url.join(path)?;
        log::trace!("[RESOURCE] Fetching: {}", resource_url);
        let response = self.probe_client.get(resource_url.clone()).send().await?;

        let status = match response.status() {
            StatusCode::OK => {
                log::debug!("[RESOURCE] Found: {}", resource_url);
                ResourceStatus::Found(resource_url.to_string())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                log::debug!("[RESOURCE] Unauthorized: {}", resource_url);
                ResourceStatus::Unauthorized(resource_url.to_string())
            }
            status => {
                log::debug!("[RESOURCE] Status {} for: {}", status, resource_url);
                ResourceStatus::NotFound
            }
        };

        Ok(status)
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
