//! The in-memory representation of one candidate publication.
//!
//! A [`Record`] is created from one provider result and enriched in place as
//! it moves through the pipeline. Derived fields stay `None` until the
//! extractor responsible for them has run.

use serde::{Deserialize, Serialize};

/// Provider-supplied bibliographic fields for one search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    /// Landing page URL of the publication
    pub url: String,
    /// Article title
    pub title: String,
    /// Declared publication year, as reported by the provider
    pub year: Option<String>,
    /// Declared citation count, as reported by the provider
    pub citations: Option<String>,
    /// Journal/Conference venue
    pub venue: String,
}

/// One candidate publication tracked through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    source_url: String,
    raw_metadata: RawMetadata,
    /// Rendered page text; `None` until a fetch succeeds
    pub page_text: Option<String>,
    /// First page line mentioning "keywords"
    pub keyword_line: Option<String>,
    /// Relevance score, a single decimal digit once normalized
    pub priority_score: u8,
    /// Year from metadata or the page's copyright notice
    pub publication_year: Option<i32>,
    /// Configured domain substring found in the URL
    pub domain_tag: Option<String>,
    /// Whether the year falls strictly inside the configured period
    pub in_period: Option<bool>,
    /// Citation count from metadata
    pub citation_count: Option<u64>,
    /// Whether the citation count reaches the configured minimum
    pub meets_citation_floor: Option<bool>,
}

impl Record {
    /// Create a record from a provider result. Every derived field starts absent.
    pub fn new(raw_metadata: RawMetadata) -> Self {
        Self {
            source_url: raw_metadata.url.clone(),
            raw_metadata,
            page_text: None,
            keyword_line: None,
            priority_score: 0,
            publication_year: None,
            domain_tag: None,
            in_period: None,
            citation_count: None,
            meets_citation_floor: None,
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn raw_metadata(&self) -> &RawMetadata {
        &self.raw_metadata
    }

    /// True when the page fetch produced usable text.
    pub fn has_content(&self) -> bool {
        self.page_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

impl From<RawMetadata> for Record {
    fn from(raw: RawMetadata) -> Self {
        Record::new(raw)
    }
}
