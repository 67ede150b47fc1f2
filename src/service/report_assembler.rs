//! ReportAssembler - runs one audit end to end and builds the final report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::config::AuditConfig;
use crate::domain::models::{AuditRequest, AuditStage, ProgressEvent, SeoReport};
use crate::error::{AppError, Result};
use crate::extractor::PageExtractor;
use crate::service::fetcher::PageFetcher;
use crate::service::gemini::Recommender;
use crate::service::pagespeed::PerformanceProvider;
use crate::service::progress::ProgressSink;
use crate::service::scoring::ScoringEngine;

pub const AI_FALLBACK_MESSAGE: &str = "Could not generate AI recommendations at this time.";

/// Emits stage events for one audit, if anyone is listening.
struct StageEmitter<'a> {
    url: &'a str,
    sink: Option<&'a dyn ProgressSink>,
}

impl StageEmitter<'_> {
    fn emit(&self, stage: AuditStage, message: impl Into<String>) {
        if let Some(sink) = self.sink {
            sink.emit(ProgressEvent::new(self.url, stage, message));
        }
    }
}

pub struct ReportAssembler {
    fetcher: PageFetcher,
    extractor: PageExtractor,
    performance: Arc<dyn PerformanceProvider>,
    scoring: ScoringEngine,
    recommender: Option<Arc<dyn Recommender>>,
    deadline: Duration,
    ai_timeout: Duration,
}

impl ReportAssembler {
    pub fn new(
        config: &AuditConfig,
        fetcher: PageFetcher,
        performance: Arc<dyn PerformanceProvider>,
    ) -> Self {
        Self {
            fetcher,
            extractor: PageExtractor::new(config.image_sample_cap, config.link_sample_cap),
            performance,
            scoring: ScoringEngine::new(),
            recommender: None,
            deadline: config.audit_deadline,
            ai_timeout: config.ai_timeout,
        }
    }

    pub fn with_recommender(mut self, recommender: Arc<dyn Recommender>) -> Self {
        self.recommender = Some(recommender);
        self
    }

    pub fn has_recommender(&self) -> bool {
        self.recommender.is_some()
    }

    /// Audit `url` and return the finished report.
    ///
    /// Only an invalid URL, a failed page fetch, or the overall deadline
    /// elapsing produce an error. Each run ends with exactly one `complete`
    /// or `error` event on `sink`.
    #[tracing::instrument(skip(self, sink))]
    pub async fn build_report(
        &self,
        url: &str,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<SeoReport> {
        let emitter = StageEmitter {
            url,
            sink: sink.as_deref(),
        };

        let outcome = match tokio::time::timeout(self.deadline, self.run(url, &emitter)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout {
                url: url.to_string(),
                seconds: self.deadline.as_secs(),
            }),
        };

        match &outcome {
            Ok(report) => {
                log::info!(
                    "[REPORT] {} scored {}/100 in {}ms",
                    report.url,
                    report.seo_score,
                    report.duration_ms
                );
                emitter.emit(
                    AuditStage::Complete,
                    format!("Audit complete: score {}/100", report.seo_score),
                );
            }
            Err(e) => {
                log::error!("[REPORT] Audit of {} failed: {}", url, e);
                emitter.emit(AuditStage::Error, e.to_string());
            }
        }

        outcome
    }

    async fn run(&self, url: &str, emitter: &StageEmitter<'_>) -> Result<SeoReport> {
        let started = Instant::now();
        let request = AuditRequest::parse(url)?;
        let page_url = &request.url;

        emitter.emit(AuditStage::Fetching, format!("Fetching {}", page_url));
        let html = self.fetcher.fetch(page_url).await?;

        emitter.emit(AuditStage::Analyzing, "Analyzing page content");
        emitter.emit(AuditStage::PageSpeed, "Measuring page performance");
        // The parsed document never crosses an await point.
        let (signals, performance) = tokio::join!(
            async { self.extractor.extract(&html, page_url) },
            self.performance.get_scores(page_url)
        );

        let technical = self.fetcher.check_technical(page_url).await;
        let breakdown = self.scoring.score(&signals, &performance, &technical);

        let base = SeoReport {
            url: page_url.to_string(),
            signals,
            technical_flags: technical,
            performance,
            seo_score: breakdown.seo_score,
            recommendations: breakdown.recommendations,
            categories: breakdown.categories,
            ai_recommendations: None,
            generated_at: Utc::now(),
            duration_ms: 0,
        };

        let ai_recommendations = match &self.recommender {
            Some(recommender) => {
                emitter.emit(AuditStage::Ai, "Generating AI recommendations");
                Some(self.ai_recommendations(recommender.as_ref(), &base).await)
            }
            None => None,
        };

        Ok(SeoReport {
            ai_recommendations,
            duration_ms: started.elapsed().as_millis() as u64,
            ..base
        })
    }

    async fn ai_recommendations(&self, recommender: &dyn Recommender, report: &SeoReport) -> Vec<String> {
        match tokio::time::timeout(self.ai_timeout, recommender.recommend(report)).await {
            Ok(Ok(recommendations)) => recommendations,
            Ok(Err(e)) => {
                log::warn!("[AI] Recommendation failed for {}: {:#}", report.url, e);
                vec![AI_FALLBACK_MESSAGE.to_string()]
            }
            Err(_) => {
                log::warn!(
                    "[AI] Recommendation for {} timed out after {}s",
                    report.url,
                    self.ai_timeout.as_secs()
                );
                vec![AI_FALLBACK_MESSAGE.to_string()]
            }
        }
    }
}
