//! Run configuration.
//!
//! Every command-line value is validated once into an immutable
//! [`CrawlerConfig`] which is then handed to the pipeline. Optional filters are
//! `None` when their flag was not supplied.

use crate::error::{CrawlerError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default per-page fetch timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of extra fetch attempts after the first failure
pub const DEFAULT_FETCH_RETRIES: u32 = 2;

/// Upper bound on extra fetch attempts
pub const MAX_FETCH_RETRIES: u32 = 10;

/// Publication year range with exclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub low: i32,
    pub high: i32,
}

impl Period {
    /// Parse `"<low>-<high>"` or `"<low> <high>"`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let parts: Vec<&str> = if trimmed.contains('-') {
            trimmed.split('-').map(str::trim).collect()
        } else {
            trimmed.split_whitespace().collect()
        };

        if parts.len() != 2 {
            return Err(CrawlerError::Config(format!(
                "Invalid period '{}': expected '<low>-<high>' or '<low> <high>'",
                input
            )));
        }

        let bound = |s: &str| {
            s.parse::<i32>().map_err(|e| {
                CrawlerError::Config(format!("Invalid period bound '{}' in '{}': {}", s, input, e))
            })
        };
        let low = bound(parts[0])?;
        let high = bound(parts[1])?;

        if low >= high {
            return Err(CrawlerError::Config(format!(
                "Invalid period '{}': lower bound must be below upper bound",
                input
            )));
        }

        Ok(Self { low, high })
    }

    /// Strict containment: both bounds excluded.
    pub fn contains(&self, year: i32) -> bool {
        year > self.low && year < self.high
    }
}

/// Domain substrings a record's URL must contain one of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainList(Vec<String>);

impl DomainList {
    /// Parse a whitespace-separated list. Entries are lowercased.
    pub fn parse(input: &str) -> Result<Self> {
        let domains: Vec<String> = input.split_whitespace().map(str::to_lowercase).collect();
        if domains.is_empty() {
            return Err(CrawlerError::Config("Domain list is empty".to_string()));
        }
        Ok(Self(domains))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Rank direction for the final output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Highest score first
    #[default]
    Descending,
    Ascending,
}

/// Where keyword matches are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeywordScope {
    /// Only the page's "Keywords" line; records without one are dropped
    #[default]
    KeywordLine,
    /// The whole page text
    WholePage,
}

/// Timeout and retry policy for page fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub initial_backoff: Duration,
}

impl FetchPolicy {
    /// Build a policy with the default backoff.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Config`] for a zero timeout or more than
    /// [`MAX_FETCH_RETRIES`] retries.
    pub fn new(timeout: Duration, retries: u32) -> Result<Self> {
        if timeout.is_zero() {
            return Err(CrawlerError::Config(
                "Fetch timeout must be greater than zero".to_string(),
            ));
        }
        if retries > MAX_FETCH_RETRIES {
            return Err(CrawlerError::Config(format!(
                "Fetch retries must be at most {}, got {}",
                MAX_FETCH_RETRIES, retries
            )));
        }
        Ok(Self {
            timeout,
            retries,
            ..Self::default()
        })
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            retries: DEFAULT_FETCH_RETRIES,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Immutable configuration for one crawler run.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Search query text
    pub query: String,
    /// Lowercased keywords used for scoring
    pub keywords: Vec<String>,
    /// Exact number of search results to request
    pub number: usize,
    /// Output file path
    pub output: PathBuf,
    pub period: Option<Period>,
    pub domains: Option<DomainList>,
    /// Inclusive minimum citation count
    pub min_citations: Option<u64>,
    pub sort_order: SortOrder,
    pub keyword_scope: KeywordScope,
    pub fetch: FetchPolicy,
}

impl CrawlerConfig {
    /// Build a configuration from the required values.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Config`] if the query or keyword list is empty.
    pub fn new(
        query: impl Into<String>,
        keywords: &str,
        number: usize,
        output: impl Into<PathBuf>,
    ) -> Result<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(CrawlerError::Config("Query must not be empty".to_string()));
        }

        Ok(Self {
            query,
            keywords: parse_keywords(keywords)?,
            number,
            output: output.into(),
            period: None,
            domains: None,
            min_citations: None,
            sort_order: SortOrder::default(),
            keyword_scope: KeywordScope::default(),
            fetch: FetchPolicy::default(),
        })
    }

    pub fn with_period(mut self, period: Option<&str>) -> Result<Self> {
        self.period = period.map(Period::parse).transpose()?;
        Ok(self)
    }

    pub fn with_domains(mut self, domains: Option<&str>) -> Result<Self> {
        self.domains = domains.map(DomainList::parse).transpose()?;
        Ok(self)
    }

    /// Set the citation floor from its textual flag value.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Parse`] if the value is not a non-negative integer.
    pub fn with_min_citations(mut self, citations: Option<&str>) -> Result<Self> {
        self.min_citations = citations
            .map(|c| {
                c.trim().parse::<u64>().map_err(|e| {
                    CrawlerError::Parse(format!("Invalid citation minimum '{}': {}", c, e))
                })
            })
            .transpose()?;
        Ok(self)
    }

    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_keyword_scope(mut self, keyword_scope: KeywordScope) -> Self {
        self.keyword_scope = keyword_scope;
        self
    }

    pub fn with_fetch_policy(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }
}

/// Split a keyword flag on commas when present, otherwise on whitespace.
fn parse_keywords(input: &str) -> Result<Vec<String>> {
    let keywords: Vec<String> = if input.contains(',') {
        input
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase)
            .collect()
    } else {
        input.split_whitespace().map(str::to_lowercase).collect()
    };

    if keywords.is_empty() {
        return Err(CrawlerError::Config("Keyword list is empty".to_string()));
    }
    Ok(keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse_dash_and_space() {
        assert_eq!(
            Period::parse("2010-2020").ok(),
            Some(Period { low: 2010, high: 2020 })
        );
        assert_eq!(
            Period::parse(" 2010  2020 ").ok(),
            Some(Period { low: 2010, high: 2020 })
        );
        assert_eq!(
            Period::parse("2010 - 2020").ok(),
            Some(Period { low: 2010, high: 2020 })
        );
    }

    #[test]
    fn test_period_parse_rejects_malformed() {
        assert!(matches!(Period::parse("2010"), Err(CrawlerError::Config(_))));
        assert!(matches!(Period::parse("2010-abc"), Err(CrawlerError::Config(_))));
        assert!(matches!(Period::parse("2010-2015-2020"), Err(CrawlerError::Config(_))));
        assert!(matches!(Period::parse("2020-2010"), Err(CrawlerError::Config(_))));
    }

    #[test]
    fn test_period_bounds_are_exclusive() {
        let period = Period { low: 2010, high: 2020 };
        assert!(period.contains(2015));
        assert!(!period.contains(2010));
        assert!(!period.contains(2020));
    }

    #[test]
    fn test_keywords_split() {
        assert_eq!(
            parse_keywords("Peptide, Molecular Dynamics").ok(),
            Some(vec!["peptide".to_string(), "molecular dynamics".to_string()])
        );
        assert_eq!(
            parse_keywords("peptide molecular").ok(),
            Some(vec!["peptide".to_string(), "molecular".to_string()])
        );
        assert!(parse_keywords(" , ").is_err());
    }

    #[test]
    fn test_optional_filters_default_absent() -> Result<()> {
        let config = CrawlerConfig::new("peptides", "peptide", 5, "out.txt")?
            .with_period(None)?
            .with_domains(None)?
            .with_min_citations(None)?;
        assert!(config.period.is_none());
        assert!(config.domains.is_none());
        assert!(config.min_citations.is_none());
        assert_eq!(config.sort_order, SortOrder::Descending);
        assert_eq!(config.keyword_scope, KeywordScope::KeywordLine);
        Ok(())
    }

    #[test]
    fn test_min_citations_parse_error() {
        let config = CrawlerConfig::new("q", "k", 1, "o").and_then(|c| c.with_min_citations(Some("ten")));
        assert!(matches!(config, Err(CrawlerError::Parse(_))));
    }

    #[test]
    fn test_fetch_policy_validation() -> Result<()> {
        let policy = FetchPolicy::new(Duration::from_secs(5), 3)?;
        assert_eq!(policy.timeout, Duration::from_secs(5));
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.initial_backoff, FetchPolicy::default().initial_backoff);

        assert!(matches!(
            FetchPolicy::new(Duration::ZERO, 1),
            Err(CrawlerError::Config(_))
        ));
        assert!(matches!(
            FetchPolicy::new(Duration::from_secs(5), MAX_FETCH_RETRIES + 1),
            Err(CrawlerError::Config(_))
        ));
        assert!(FetchPolicy::new(Duration::from_secs(5), MAX_FETCH_RETRIES).is_ok());
        Ok(())
    }

    #[test]
    fn test_domains_lowercased() -> Result<()> {
        let domains = DomainList::parse("Nature.com  science.org")?;
        assert_eq!(domains.iter().collect::<Vec<_>>(), vec!["nature.com", "science.org"]);
        Ok(())
    }
}
