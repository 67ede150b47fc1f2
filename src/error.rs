//! Error types for the SEO audit engine.
//!
//! This module provides structured error handling with:
//! - `AppError`: Domain-specific errors surfaced by an audit
//! - `Result<T>`: Type alias for Results using AppError
//!
//! Only a failure to retrieve the audited page (or the audit deadline
//! elapsing) ever reaches the caller. Probe, performance and AI failures are
//! recovered inside their services and never become an `AppError` at the
//! report boundary.

use thiserror::Error;

// ============================================================================
// DOMAIN ERROR TYPE
// ============================================================================

/// Domain-specific errors for audit operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or malformed URL (not absolute, or not http/https)
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The audited page itself could not be retrieved
    #[error("Failed to fetch {url}: {cause}")]
    Fetch { url: String, cause: String },

    /// The end-to-end audit deadline elapsed
    #[error("Audit of {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// External service error (PageSpeed, Gemini, etc.)
    #[error("Service error ({service}): {message}")]
    ServiceError { service: &'static str, message: String },

    /// The queued job runner could not accept or finish a job
    #[error("Job runner error: {0}")]
    JobRunner(String),

    /// Generic error with context
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, cause: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    /// Create a service error
    pub fn service(service: &'static str, msg: impl Into<String>) -> Self {
        Self::ServiceError {
            service,
            message: msg.into(),
        }
    }

    /// Whether this error is the terminal page-fetch failure of an audit.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::InvalidUrl(_))
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
