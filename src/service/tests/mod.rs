//! Shared fixtures for the assembler and runner tests.


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::AuditConfig;
use crate::domain::models::{
    AuditStage, PerformanceScores, ProgressEvent, ScoreSource, SeoReport,
};
use crate::service::fetcher::PageFetcher;
use crate::service::gemini::Recommender;
use crate::service::pagespeed::PerformanceProvider;
use crate::service::progress::ProgressSink;
use crate::service::report_assembler::ReportAssembler;

/// Performance provider returning fixed scores, optionally after a delay.
pub struct StubPerformance {
    scores: PerformanceScores,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubPerformance {
    pub fn measured(mobile: u8, desktop: u8) -> Self {
        Self {
            scores: PerformanceScores::new(Some(mobile), Some(desktop), ScoreSource::Measured),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn mock(mobile: u8, desktop: u8) -> Self {
        Self {
            scores: PerformanceScores::new(Some(mobile), Some(desktop), ScoreSource::Mock),
            ..Self::measured(mobile, desktop)
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::measured(90, 90)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PerformanceProvider for StubPerformance {
    async fn get_scores(&self, _url: &Url) -> PerformanceScores {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.scores
    }
}

pub enum StubRecommender {
    Lines(Vec<String>),
    Fails,
    Hangs,
}

#[async_trait]
impl Recommender for StubRecommender {
    async fn recommend(&self, _report: &SeoReport) -> anyhow::Result<Vec<String>> {
        match self {
            StubRecommender::Lines(lines) => Ok(lines.clone()),
            StubRecommender::Fails => anyhow::bail!("model unavailable"),
            StubRecommender::Hangs => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }
}

/// Sink that records every event it sees.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn stages(&self) -> Vec<AuditStage> {
        self.events.lock().unwrap().iter().map(|e| e.stage).collect()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn test_config() -> AuditConfig {
    AuditConfig {
        fetch_timeout: Duration::from_secs(5),
        probe_timeout: Duration::from_secs(2),
        audit_deadline: Duration::from_secs(30),
        ai_timeout: Duration::from_secs(2),
        ..AuditConfig::default()
    }
}

pub fn assembler_with(config: &AuditConfig, performance: Arc<dyn PerformanceProvider>) -> ReportAssembler {
    ReportAssembler::new(config, PageFetcher::new(config).unwrap(), performance)
}

/// A page that earns full marks in every markup category.
pub fn well_formed_page() -> String {
    let title = "t".repeat(45);
    let description = "d".repeat(140);
    let images: String = (1..=5)
        .map(|i| format!(r#"<img src="/img/{i}.png" alt="Picture {i}">"#))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <meta name="description" content="{description}">
  <meta property="og:title" content="Title">
  <meta property="og:description" content="Description">
  <meta property="og:image" content="/og.png">
  <meta property="og:url" content="/">
</head>
<body>
  <h1>Main topic</h1>
  <h2>Section</h2>
  {images}
  <a href="/about">About</a>
  <a href="/blog">Blog</a>
  <a href="/contact">Contact</a>
</body>
</html>"#
    )
}

/// Serve `html` at `/` and optionally robots.txt / sitemap.xml.
pub async fn serve_site(
    server: &mut mockito::Server,
    html: &str,
    robots: bool,
    sitemap: bool,
) -> Vec<mockito::Mock> {
    let mut mocks = vec![
        server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(html)
            .create_async()
            .await,
    ];

    for (present, path) in [(robots, "/robots.txt"), (sitemap, "/sitemap.xml")] {
        let status = if present { 200 } else { 404 };
        mocks.push(
            server
                .mock("GET", path)
                .with_status(status)
                .create_async()
                .await,
        );
    }

    mocks
}
