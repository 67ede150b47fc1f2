//! Process wiring: logging setup and construction of the audit services.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::AuditConfig;
use crate::service::{
    GeminiRecommender, JobRunner, PageFetcher, PageSpeedProvider, ReportAssembler, TtlCache,
};

/// Initialize logging with tracing_subscriber. `RUST_LOG` directives are
/// applied on top of the defaults.
pub fn init_logging() {
    let mut filter = EnvFilter::new("info");
    for directive in ["seo_audit=debug", "hyper=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    if let Ok(env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        for directive in env.split(',').filter_map(|d| d.trim().parse().ok()) {
            filter = filter.add_directive(directive);
        }
    }

    // A subscriber may already be installed (tests, embedding apps).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build the audit pipeline described by `config`.
///
/// The performance cache is created here and shared with the PageSpeed
/// provider only; the AI stage is wired in when a Gemini key is set.
pub fn build_assembler(config: &AuditConfig) -> Result<ReportAssembler> {
    let cache = Arc::new(TtlCache::new(config.performance_cache_ttl));
    let performance = Arc::new(PageSpeedProvider::new(config, cache)?);
    let fetcher = PageFetcher::new(config)?;

    let assembler = ReportAssembler::new(config, fetcher, performance);
    let assembler = match GeminiRecommender::from_config(config)? {
        Some(recommender) => {
            log::info!("[AI] Gemini recommendations enabled ({})", config.gemini_model);
            assembler.with_recommender(Arc::new(recommender))
        }
        None => {
            log::info!("[AI] GEMINI_API_KEY not set, AI recommendations disabled");
            assembler
        }
    };

    Ok(assembler)
}

/// Build the job runner for `config.runner_mode`. Must be called inside a
/// tokio runtime when the queued mode is selected.
pub fn build_runner(config: &AuditConfig) -> Result<JobRunner> {
    let assembler = Arc::new(build_assembler(config)?);
    Ok(JobRunner::new(config.runner_mode, assembler, config.queue_capacity))
}
