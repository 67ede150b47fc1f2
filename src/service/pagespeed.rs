//! Performance scores from the PageSpeed Insights API.
//!
//! Scores are cached per URL. Without an API key, or when the API fails in
//! any way, placeholder scores are generated instead; `get_scores` never
//! fails.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

use crate::config::AuditConfig;
use crate::domain::models::{PerformanceScores, ScoreSource};
use crate::error::{AppError, Result};
use crate::service::cache::TtlCache;
use crate::service::http::{create_client, ClientType};

const SERVICE: &str = "pagespeed";

/// Source of mobile/desktop performance scores.
#[async_trait]
pub trait PerformanceProvider: Send + Sync {
    /// Always resolves; unavailable scores are `None`, never an error.
    async fn get_scores(&self, url: &Url) -> PerformanceScores;
}

/// How the desktop score is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DesktopPolicy {
    /// One API call (mobile); desktop = mobile + 5..15, capped at 100.
    #[default]
    EstimateFromMobile,
    /// Two concurrent API calls, one per strategy.
    MeasureBoth,
}

impl FromStr for DesktopPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "estimate" | "estimate_from_mobile" => Ok(Self::EstimateFromMobile),
            "measure" | "measure_both" => Ok(Self::MeasureBoth),
            other => Err(format!("unknown desktop policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

/// Subset of the PageSpeed v5 response we read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageSpeedResponse {
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    categories: Option<Categories>,
}

#[derive(Debug, Deserialize)]
struct Categories {
    performance: Option<CategoryScore>,
}

#[derive(Debug, Deserialize)]
struct CategoryScore {
    score: Option<f64>,
}

impl PageSpeedResponse {
    fn performance_ratio(&self) -> Option<f64> {
        self.lighthouse_result
            .as_ref()?
            .categories
            .as_ref()?
            .performance
            .as_ref()?
            .score
    }
}

/// `PerformanceProvider` backed by the PageSpeed Insights API.
pub struct PageSpeedProvider {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    policy: DesktopPolicy,
    cache: Arc<TtlCache<PerformanceScores>>,
}

impl PageSpeedProvider {
    pub fn new(config: &AuditConfig, cache: Arc<TtlCache<PerformanceScores>>) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_client(ClientType::PageSpeed, config)?,
            api_key: config.pagespeed_api_key.clone(),
            endpoint: config.pagespeed_endpoint.clone(),
            policy: config.desktop_policy,
            cache,
        })
    }

    pub fn policy(&self) -> DesktopPolicy {
        self.policy
    }

    async fn measure(&self, url: &Url, api_key: &str) -> Result<PerformanceScores> {
        match self.policy {
            DesktopPolicy::EstimateFromMobile => {
                let mobile = self.run_strategy(url, api_key, Strategy::Mobile).await?;
                Ok(PerformanceScores::new(
                    Some(mobile),
                    Some(estimate_desktop(mobile)),
                    ScoreSource::Estimated,
                ))
            }
            DesktopPolicy::MeasureBoth => {
                let (mobile, desktop) = tokio::join!(
                    self.run_strategy(url, api_key, Strategy::Mobile),
                    self.run_strategy(url, api_key, Strategy::Desktop)
                );
                let mobile = mobile?;
                Ok(match desktop {
                    Ok(desktop) => {
                        PerformanceScores::new(Some(mobile), Some(desktop), ScoreSource::Measured)
                    }
                    Err(e) => {
                        log::warn!("[PAGESPEED] Desktop run failed for {}: {}", url, e);
                        PerformanceScores::new(
                            Some(mobile),
                            Some(estimate_desktop(mobile)),
                            ScoreSource::Estimated,
                        )
                    }
                })
            }
        }
    }

    async fn run_strategy(&self, url: &Url, api_key: &str, strategy: Strategy) -> Result<u8> {
        log::debug!("[PAGESPEED] Running {} strategy for {}", strategy.as_str(), url);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("url", url.as_str()),
                ("strategy", strategy.as_str()),
                ("category", "performance"),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|e| AppError::service(SERVICE, format!("request failed: {e}")))?;

        if response.status() != StatusCode::OK {
            return Err(AppError::service(
                SERVICE,
                format!("unexpected status {}", response.status()),
            ));
        }

        let body: PageSpeedResponse = response
            .json()
            .await
            .map_err(|e| AppError::service(SERVICE, format!("invalid response: {e}")))?;

        let ratio = body
            .performance_ratio()
            .ok_or_else(|| AppError::service(SERVICE, "missing performance score"))?;

        Ok(ratio_to_score(ratio))
    }
}

#[async_trait]
impl PerformanceProvider for PageSpeedProvider {
    async fn get_scores(&self, url: &Url) -> PerformanceScores {
        let key = url.as_str();
        if let Some(cached) = self.cache.get(key) {
            log::debug!("[CACHE] Performance hit for {}", url);
            return cached;
        }

        let scores = match self.api_key.as_deref() {
            None => {
                log::debug!("[PAGESPEED] No API key configured, using placeholder scores");
                mock_scores()
            }
            Some(api_key) => match self.measure(url, api_key).await {
                Ok(scores) => scores,
                Err(e) => {
                    log::warn!("[PAGESPEED] Falling back to placeholder scores for {}: {}", url, e);
                    mock_scores()
                }
            },
        };

        self.cache.insert(key, scores);
        scores
    }
}

/// Convert a 0..1 performance ratio to a 0..100 score.
pub fn ratio_to_score(ratio: f64) -> u8 {
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Placeholder pair: mobile in [60, 100), desktop in [70, 100).
pub fn mock_scores() -> PerformanceScores {
    let mut rng = rand::thread_rng();
    PerformanceScores::new(
        Some(rng.gen_range(60..100)),
        Some(rng.gen_range(70..100)),
        ScoreSource::Mock,
    )
}

/// Desktop estimate: mobile plus a random offset in [5, 15), capped at 100.
pub fn estimate_desktop(mobile: u8) -> u8 {
    let offset: u8 = rand::thread_rng().gen_range(5..15);
    mobile.saturating_add(offset).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    fn provider(server_url: Option<&str>, policy: DesktopPolicy) -> PageSpeedProvider {
        let config = AuditConfig {
            pagespeed_api_key: server_url.map(|_| "test-key".to_string()),
            pagespeed_endpoint: server_url
                .map(|u| format!("{u}/runPagespeed"))
                .unwrap_or_default(),
            desktop_policy: policy,
            ..AuditConfig::default()
        };
        let cache = Arc::new(TtlCache::new(Duration::from_secs(3600)));
        PageSpeedProvider::new(&config, cache).unwrap()
    }

    fn assert_mock(scores: &PerformanceScores) {
        assert_eq!(scores.source, ScoreSource::Mock);
        assert!(scores.mobile.is_some_and(|m| (60..100).contains(&m)));
        assert!(scores.desktop.is_some_and(|d| (70..100).contains(&d)));
    }

    fn psi_body(score: f64) -> String {
        format!(r#"{{"lighthouseResult":{{"categories":{{"performance":{{"score":{score}}}}}}}}}"#)
    }

    #[test]
    fn test_ratio_to_score_rounds_and_clamps() {
        assert_eq!(ratio_to_score(0.874), 87);
        assert_eq!(ratio_to_score(0.875), 88);
        assert_eq!(ratio_to_score(1.2), 100);
        assert_eq!(ratio_to_score(-0.1), 0);
    }

    #[test]
    fn test_estimate_desktop_range_and_cap() {
        for _ in 0..200 {
            let desktop = estimate_desktop(50);
            assert!((55..65).contains(&desktop));
        }
        assert_eq!(estimate_desktop(99), 100);
        assert_eq!(estimate_desktop(100), 100);
    }

    #[test]
    fn test_mock_scores_ranges() {
        for _ in 0..200 {
            assert_mock(&mock_scores());
        }
    }

    #[test]
    fn test_desktop_policy_parsing() {
        assert_eq!("estimate".parse(), Ok(DesktopPolicy::EstimateFromMobile));
        assert_eq!("MEASURE".parse(), Ok(DesktopPolicy::MeasureBoth));
        assert!("sometimes".parse::<DesktopPolicy>().is_err());
    }

    #[test]
    fn test_response_parsing_tolerates_missing_fields() {
        let full: PageSpeedResponse = serde_json::from_str(&psi_body(0.42)).unwrap();
        assert_eq!(full.performance_ratio(), Some(0.42));

        let partial: PageSpeedResponse =
            serde_json::from_str(r#"{"lighthouseResult":{"categories":{}}}"#).unwrap();
        assert_eq!(partial.performance_ratio(), None);
    }

    #[tokio::test]
    async fn test_no_api_key_returns_mock_and_caches_it() {
        let provider = provider(None, DesktopPolicy::EstimateFromMobile);
        let url = Url::parse("https://example.com/").unwrap();

        let first = provider.get_scores(&url).await;
        assert_mock(&first);

        for _ in 0..5 {
            assert_eq!(provider.get_scores(&url).await, first);
        }
    }

    #[tokio::test]
    async fn test_api_success_estimates_desktop() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/runPagespeed")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("strategy".into(), "mobile".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
                Matcher::UrlEncoded("url".into(), "https://example.com/".into()),
            ]))
            .with_status(200)
            .with_body(psi_body(0.87))
            .expect(1)
            .create_async()
            .await;

        let provider = provider(Some(&server.url()), DesktopPolicy::EstimateFromMobile);
        let url = Url::parse("https://example.com/").unwrap();

        let scores = provider.get_scores(&url).await;
        assert_eq!(scores.mobile, Some(87));
        assert!(scores.desktop.is_some_and(|d| (92..=100).contains(&d)));
        assert_eq!(scores.source, ScoreSource::Estimated);

        // Second call is served from cache: no new request, same values.
        assert_eq!(provider.get_scores(&url).await, scores);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_status_falls_back_to_mock() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/runPagespeed")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let provider = provider(Some(&server.url()), DesktopPolicy::EstimateFromMobile);
        let scores = provider
            .get_scores(&Url::parse("https://example.com/").unwrap())
            .await;
        assert_mock(&scores);
    }

    #[tokio::test]
    async fn test_missing_score_falls_back_to_mock() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/runPagespeed")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"lighthouseResult":{"categories":{"performance":{"score":null}}}}"#)
            .create_async()
            .await;

        let provider = provider(Some(&server.url()), DesktopPolicy::EstimateFromMobile);
        let scores = provider
            .get_scores(&Url::parse("https://example.com/").unwrap())
            .await;
        assert_mock(&scores);
    }

    #[tokio::test]
    async fn test_measure_both_uses_each_strategy() {
        let mut server = mockito::Server::new_async().await;
        let _mobile = server
            .mock("GET", "/runPagespeed")
            .match_query(Matcher::UrlEncoded("strategy".into(), "mobile".into()))
            .with_status(200)
            .with_body(psi_body(0.61))
            .create_async()
            .await;
        let _desktop = server
            .mock("GET", "/runPagespeed")
            .match_query(Matcher::UrlEncoded("strategy".into(), "desktop".into()))
            .with_status(200)
            .with_body(psi_body(0.93))
            .create_async()
            .await;

        let provider = provider(Some(&server.url()), DesktopPolicy::MeasureBoth);
        let scores = provider
            .get_scores(&Url::parse("https://example.com/").unwrap())
            .await;

        assert_eq!(
            scores,
            PerformanceScores::new(Some(61), Some(93), ScoreSource::Measured)
        );
    }

    #[tokio::test]
    async fn test_measure_both_estimates_when_desktop_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mobile = server
            .mock("GET", "/runPagespeed")
            .match_query(Matcher::UrlEncoded("strategy".into(), "mobile".into()))
            .with_status(200)
            .with_body(psi_body(0.70))
            .create_async()
            .await;
        let _desktop = server
            .mock("GET", "/runPagespeed")
            .match_query(Matcher::UrlEncoded("strategy".into(), "desktop".into()))
            .with_status(500)
            .create_async()
            .await;

        let provider = provider(Some(&server.url()), DesktopPolicy::MeasureBoth);
        let scores = provider
            .get_scores(&Url::parse("https://example.com/").unwrap())
            .await;

        assert_eq!(scores.mobile, Some(70));
        assert!(scores.desktop.is_some_and(|d| (75..85).contains(&d)));
        assert_eq!(scores.source, ScoreSource::Estimated);
    }
}
