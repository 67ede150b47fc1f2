pub mod cache;
pub mod fetcher;
pub mod gemini;
pub mod http;
pub mod pagespeed;
pub mod progress;
pub mod report_assembler;
pub mod runner;
pub mod scoring;

pub use cache::TtlCache;
pub use fetcher::PageFetcher;
pub use gemini::{GeminiRecommender, Recommender};
pub use pagespeed::{DesktopPolicy, PageSpeedProvider, PerformanceProvider};
pub use progress::{NoopSink, ProgressBroadcaster, ProgressSink, ProgressSubscription};
pub use report_assembler::ReportAssembler;
pub use runner::{JobRunner, JobState, RunnerMode};
pub use scoring::ScoringEngine;

#[cfg(test)]
mod tests;
