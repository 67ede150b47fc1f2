//! Audit configuration.
//!
//! Defaults cover every field, so an audit can run with no environment at
//! all: no PageSpeed key means mock performance scores, no Gemini key means
//! the AI stage is skipped.

use std::str::FromStr;
use std::time::Duration;

use crate::extractor::page_extractor::{DEFAULT_IMAGE_SAMPLE_CAP, DEFAULT_LINK_SAMPLE_CAP};
use crate::service::pagespeed::DesktopPolicy;
use crate::service::runner::RunnerMode;

pub const DEFAULT_USER_AGENT: &str = "SEOAuditBot/1.0 (+https://github.com/seo-audit)";
pub const DEFAULT_PAGESPEED_ENDPOINT: &str =
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct AuditConfig {
    // Timeouts
    pub fetch_timeout: Duration,
    pub probe_timeout: Duration,
    pub pagespeed_timeout: Duration,
    pub ai_timeout: Duration,
    pub audit_deadline: Duration,

    // Fetching / extraction
    pub user_agent: String,
    pub image_sample_cap: usize,
    pub link_sample_cap: usize,

    // Performance
    pub performance_cache_ttl: Duration,
    pub pagespeed_api_key: Option<String>,
    pub pagespeed_endpoint: String,
    pub desktop_policy: DesktopPolicy,

    // AI
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_endpoint: String,

    // Execution
    pub runner_mode: RunnerMode,
    pub queue_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(5),
            pagespeed_timeout: Duration::from_secs(25),
            ai_timeout: Duration::from_secs(30),
            audit_deadline: Duration::from_secs(120),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            image_sample_cap: DEFAULT_IMAGE_SAMPLE_CAP,
            link_sample_cap: DEFAULT_LINK_SAMPLE_CAP,
            performance_cache_ttl: Duration::from_secs(60 * 60),
            pagespeed_api_key: None,
            pagespeed_endpoint: DEFAULT_PAGESPEED_ENDPOINT.to_string(),
            desktop_policy: DesktopPolicy::EstimateFromMobile,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            runner_mode: RunnerMode::Immediate,
            queue_capacity: 32,
        }
    }
}

impl AuditConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        config.log_keys();
        config
    }

    /// Build configuration from an arbitrary key lookup. Unset keys keep their
    /// defaults; unparsable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            parse_or(&lookup, key, default.as_secs()).map_or(default, Duration::from_secs)
        };

        Self {
            fetch_timeout: secs("SEO_AUDIT_FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            probe_timeout: secs("SEO_AUDIT_PROBE_TIMEOUT_SECS", defaults.probe_timeout),
            pagespeed_timeout: secs("SEO_AUDIT_PAGESPEED_TIMEOUT_SECS", defaults.pagespeed_timeout),
            ai_timeout: secs("SEO_AUDIT_AI_TIMEOUT_SECS", defaults.ai_timeout),
            audit_deadline: secs("SEO_AUDIT_DEADLINE_SECS", defaults.audit_deadline),
            user_agent: non_empty(&lookup, "SEO_AUDIT_USER_AGENT")
                .unwrap_or(defaults.user_agent),
            image_sample_cap: defaults.image_sample_cap,
            link_sample_cap: defaults.link_sample_cap,
            performance_cache_ttl: secs("SEO_AUDIT_CACHE_TTL_SECS", defaults.performance_cache_ttl),
            pagespeed_api_key: non_empty(&lookup, "PAGESPEED_API_KEY"),
            pagespeed_endpoint: non_empty(&lookup, "PAGESPEED_ENDPOINT")
                .unwrap_or(defaults.pagespeed_endpoint),
            desktop_policy: parse_or(&lookup, "SEO_AUDIT_DESKTOP_POLICY", defaults.desktop_policy)
                .unwrap_or(defaults.desktop_policy),
            gemini_api_key: non_empty(&lookup, "GEMINI_API_KEY"),
            gemini_model: non_empty(&lookup, "GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_endpoint: non_empty(&lookup, "GEMINI_ENDPOINT")
                .unwrap_or(defaults.gemini_endpoint),
            runner_mode: parse_or(&lookup, "SEO_AUDIT_RUNNER", defaults.runner_mode)
                .unwrap_or(defaults.runner_mode),
            queue_capacity: parse_or(&lookup, "SEO_AUDIT_QUEUE_CAPACITY", defaults.queue_capacity)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.queue_capacity),
        }
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let n = v.chars().count().min(4);
                    let head: String = v.chars().take(n).collect();
                    format!("{}...({} chars)", head, v.len())
                }
                None => "<not set>".to_string(),
            }
        }

        log::info!("Config loaded:");
        log::info!("  PAGESPEED_API_KEY: {}", preview_opt(&self.pagespeed_api_key));
        log::info!("  GEMINI_API_KEY: {}", preview_opt(&self.gemini_api_key));
        log::info!("  desktop policy: {:?}, runner: {:?}", self.desktop_policy, self.runner_mode);
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `Some(value)` when the key is unset (the default) or parses; `None` when
/// it is set but malformed.
fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Option<T> {
    match non_empty(lookup, key) {
        None => Some(default),
        Some(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring malformed {}={:?}, using default", key, raw);
                None
            }
        },
    }
}
