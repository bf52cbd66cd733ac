//! Custom error types for scholarcrawl.
//!
//! This module defines all error types used throughout the crawler.
//! All functions return `Result<T, CrawlerError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for scholarcrawl operations.
///
/// Only [`CrawlerError::Fetch`] is recovered from inside the pipeline (the
/// record loses its page text); every other variant aborts the run.
#[derive(Debug, Error)]
pub enum CrawlerError {
    /// Search backend ran out of results before the requested count
    #[error("Search provider exhausted: requested {requested} results, only {found} available")]
    ProviderExhaustion {
        /// Number of results asked for
        requested: usize,
        /// Number of usable results the backend returned
        found: usize,
    },

    /// Page could not be fetched or rendered to text
    #[error("Fetch error for {url}: {reason}")]
    Fetch {
        /// URL that failed
        url: String,
        /// Underlying cause
        reason: String,
    },

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Malformed input (year, citation count, HTML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message from API
        message: String,
    },

    /// CAPTCHA detected
    #[error("CAPTCHA detected, please refresh cookies")]
    Captcha,

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (missing or malformed flag)
    #[error("Config error: {0}")]
    Config(String),
}

impl CrawlerError {
    /// Build a [`CrawlerError::Fetch`] for `url`.
    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        CrawlerError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using `CrawlerError`
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| CrawlerError::Parse(msg.to_string()))
    }
}
