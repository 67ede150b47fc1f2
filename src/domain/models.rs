//! Audit entities - behavior lives WITH data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

// ====== Enums ======

/// Outcome of probing a well-known site resource (robots.txt, sitemap.xml).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceStatus {
    Found(String),
    Unauthorized(String),
    NotFound,
}

impl ResourceStatus {
    /// Only a plain 200 counts as present; a protected resource is not
    /// readable by crawlers either.
    pub fn is_found(&self) -> bool {
        matches!(self, ResourceStatus::Found(_))
    }
}

/// Where a pair of performance scores came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// Both strategies measured by the performance API
    Measured,
    /// Mobile measured, desktop derived from it
    Estimated,
    /// Placeholder values, not authoritative
    Mock,
}

/// One scored dimension of the audit, in rubric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RubricCategory {
    Title,
    Description,
    Headings,
    Images,
    Links,
    OpenGraph,
    Technical,
    Performance,
}

impl RubricCategory {
    pub fn max_points(&self) -> u32 {
        match self {
            RubricCategory::Title => 20,
            RubricCategory::Description => 15,
            RubricCategory::Headings => 15,
            RubricCategory::Images => 10,
            RubricCategory::Links => 10,
            RubricCategory::OpenGraph => 10,
            RubricCategory::Technical => 15,
            RubricCategory::Performance => 15,
        }
    }
}

/// Pipeline stage reported to progress subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStage {
    Fetching,
    Analyzing,
    PageSpeed,
    Ai,
    Complete,
    Error,
}

impl AuditStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStage::Fetching => "fetching",
            AuditStage::Analyzing => "analyzing",
            AuditStage::PageSpeed => "pagespeed",
            AuditStage::Ai => "ai",
            AuditStage::Complete => "complete",
            AuditStage::Error => "error",
        }
    }

    /// Nominal completion percentage when this stage starts.
    pub fn progress(&self) -> u8 {
        match self {
            AuditStage::Fetching => 10,
            AuditStage::Analyzing => 40,
            AuditStage::PageSpeed => 60,
            AuditStage::Ai => 85,
            AuditStage::Complete | AuditStage::Error => 100,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuditStage::Complete | AuditStage::Error)
    }
}

// ====== Request ======

/// A single audit request. Only absolute http/https URLs are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRequest {
    pub url: Url,
}

impl AuditRequest {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim()).map_err(|e| AppError::InvalidUrl(format!("{raw}: {e}")))?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(Self { url }),
            scheme => Err(AppError::InvalidUrl(format!(
                "{raw}: unsupported scheme or missing host ({scheme})"
            ))),
        }
    }
}

// ====== Page signals ======

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingCounts {
    pub h1: usize,
    pub h2: usize,
    pub h3: usize,
    pub h4: usize,
    pub h5: usize,
    pub h6: usize,
}

impl HeadingCounts {
    /// Record one heading by level (1..=6); other levels are ignored.
    pub fn record(&mut self, level: u8) {
        match level {
            1 => self.h1 += 1,
            2 => self.h2 += 1,
            3 => self.h3 += 1,
            4 => self.h4 += 1,
            5 => self.h5 += 1,
            6 => self.h6 += 1,
            _ => {}
        }
    }
}

/// Alt-text statistics. `total` counts every `<img>` on the page while
/// `with_alt` / `without_alt` only cover the sampled prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStats {
    pub total: usize,
    pub with_alt: usize,
    pub without_alt: usize,
    pub missing_alt_samples: Vec<String>,
}

impl ImageStats {
    pub fn sampled(&self) -> usize {
        self.with_alt + self.without_alt
    }

    /// Share of sampled images carrying alt text, as a percentage.
    pub fn alt_coverage(&self) -> Option<f64> {
        match self.sampled() {
            0 => None,
            n => Some(self.with_alt as f64 * 100.0 / n as f64),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStats {
    pub internal: usize,
    pub external: usize,
    pub broken: usize,
    pub broken_samples: Vec<String>,
}

impl LinkStats {
    pub fn has_links(&self) -> bool {
        self.internal + self.external > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraphTags {
    pub has_title: bool,
    pub has_description: bool,
    pub has_image: bool,
    pub has_url: bool,
}

impl OpenGraphTags {
    pub fn present_count(&self) -> u32 {
        [self.has_title, self.has_description, self.has_image, self.has_url]
            .iter()
            .filter(|present| **present)
            .count() as u32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitterCardTags {
    pub has_card_type: bool,
    pub has_title: bool,
    pub has_description: bool,
    pub has_image: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalTags {
    pub viewport: bool,
    pub charset: bool,
}

/// Everything extracted from the page markup in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignals {
    pub title: String,
    pub description: String,
    pub headings: HeadingCounts,
    pub images: ImageStats,
    pub links: LinkStats,
    pub open_graph: OpenGraphTags,
    pub twitter_card: TwitterCardTags,
    pub technical: TechnicalTags,
}

// ====== Auxiliary checks ======

/// robots.txt / sitemap.xml presence. Each flag defaults to `false` on any
/// probe failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalFlags {
    pub has_robots_txt: bool,
    pub has_sitemap: bool,
}

/// Mobile / desktop performance scores (0-100). `None` means unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceScores {
    pub mobile: Option<u8>,
    pub desktop: Option<u8>,
    pub source: ScoreSource,
}

impl PerformanceScores {
    pub fn new(mobile: Option<u8>, desktop: Option<u8>, source: ScoreSource) -> Self {
        Self {
            mobile,
            desktop,
            source,
        }
    }

    /// Average of both strategies, only when both are known.
    pub fn average(&self) -> Option<f64> {
        match (self.mobile, self.desktop) {
            (Some(m), Some(d)) => Some((m as f64 + d as f64) / 2.0),
            _ => None,
        }
    }
}

// ====== Scoring ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: RubricCategory,
    pub points: u32,
    pub max_points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub seo_score: u8,
    pub recommendations: Vec<String>,
    pub categories: Vec<CategoryScore>,
}

// ====== Report ======

/// Final audit report. Built once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoReport {
    pub url: String,
    #[serde(flatten)]
    pub signals: PageSignals,
    #[serde(flatten)]
    pub technical_flags: TechnicalFlags,
    pub performance: PerformanceScores,
    pub seo_score: u8,
    pub recommendations: Vec<String>,
    pub categories: Vec<CategoryScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_recommendations: Option<Vec<String>>,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Event delivered to progress subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub url: String,
    pub stage: AuditStage,
    pub message: String,
    pub progress: u8,
}

impl ProgressEvent {
    pub fn new(url: &str, stage: AuditStage, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            stage,
            message: message.into(),
            progress: stage.progress(),
        }
    }
}
