//! Signal extractors.
//!
//! Pure functions that derive a record's year, keyword line, keyword matches,
//! domain tag and citation signals from its metadata and page text. None of
//! them panic on missing input; they return `None` instead.

use crate::config::{DomainList, Period};
use crate::error::{CrawlerError, Result};
use crate::record::RawMetadata;
use regex::{Regex, RegexBuilder};

/// Token that introduces the year fallback on a page
const COPYRIGHT_TOKEN: &str = "copyright";

/// Number of characters after the copyright token searched for a year
const COPYRIGHT_WINDOW: usize = 20;

/// Token marking a page's keyword line
const KEYWORDS_TOKEN: &str = "keywords";

/// Year declared by the search provider, if it parses as an integer.
pub fn year_from_metadata(raw: &RawMetadata) -> Option<i32> {
    raw.year.as_deref()?.trim().parse().ok()
}

/// First run of digits within [`COPYRIGHT_WINDOW`] characters after the first
/// case-insensitive "copyright" in `text`.
pub fn year_from_copyright(text: &str) -> Option<i32> {
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let start = text.to_ascii_lowercase().find(COPYRIGHT_TOKEN)? + COPYRIGHT_TOKEN.len();
    let digits: String = text[start..]
        .chars()
        .take(COPYRIGHT_WINDOW)
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Provider year first, page copyright notice as fallback.
pub fn publication_year(raw: &RawMetadata, page_text: Option<&str>) -> Option<i32> {
    year_from_metadata(raw).or_else(|| page_text.and_then(year_from_copyright))
}

/// First line of `text` whose content contains "keywords", ignoring case.
pub fn keyword_line(text: &str) -> Option<&str> {
    text.lines()
        .find(|line| line.to_lowercase().contains(KEYWORDS_TOKEN))
}

/// Case-insensitive literal matcher for the configured keywords.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    patterns: Vec<Regex>,
}

impl KeywordScorer {
    /// Compile one case-insensitive literal pattern per keyword.
    pub fn new(keywords: &[String]) -> Result<Self> {
        let patterns = keywords
            .iter()
            .map(|keyword| {
                RegexBuilder::new(&regex::escape(keyword))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CrawlerError::Parse(format!("Invalid keyword '{}': {}", keyword, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Number of distinct keywords that occur in `haystack`.
    pub fn count_matches(&self, haystack: &str) -> usize {
        self.patterns.iter().filter(|p| p.is_match(haystack)).count()
    }
}

/// First configured domain contained in `url`, ignoring case.
pub fn domain_tag(url: &str, domains: &DomainList) -> Option<String> {
    let url = url.to_lowercase();
    domains
        .iter()
        .find(|domain| url.contains(domain))
        .map(str::to_string)
}

/// Whether `year` lies strictly inside `period`.
pub fn in_period(year: i32, period: &Period) -> bool {
    period.contains(year)
}

/// Citation count declared by the search provider.
///
/// Missing or blank values are `None`. Thousands separators are accepted.
///
/// # Errors
///
/// Returns [`CrawlerError::Parse`] when the provider value is not a number.
pub fn citation_count(raw: &RawMetadata) -> Result<Option<u64>> {
    let Some(value) = raw.citations.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    value
        .replace(',', "")
        .parse::<u64>()
        .map(Some)
        .map_err(|e| {
            CrawlerError::Parse(format!(
                "Invalid citation count '{}' for {}: {}",
                value, raw.url, e
            ))
        })
}

/// Inclusive citation floor check.
pub fn meets_citation_floor(count: u64, minimum: u64) -> bool {
    count >= minimum
}
