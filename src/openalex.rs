//! OpenAlex search provider.
//!
//! Alternative backend using the OpenAlex works API. Results carry the
//! publication year and citation count directly, so no HTML scraping is
//! needed for metadata.
//!
//! API Best Practices (per OpenAlex docs):
//! - Use `mailto:email` parameter for polite pool (10 req/s vs 1 req/s)
//! - Implement exponential backoff for retries

use crate::error::{CrawlerError, Result};
use crate::record::RawMetadata;
use crate::search::{ResultCollector, SearchProvider};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// OpenAlex API base URL
const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Maximum results per page (OpenAlex limit)
const MAX_PER_PAGE: usize = 200;

/// Email for polite pool access
const POLITE_EMAIL: &str = "scholarcrawl@example.com";

/// Rate-limit retries per page
const MAX_RETRIES: u32 = 3;

/// OpenAlex backend.
pub struct OpenAlex {
    client: Client,
    base_url: String,
}

impl OpenAlex {
    pub fn new() -> Result<Self> {
        Self::with_base_url(OPENALEX_API_BASE)
    }

    /// Point the provider at a different API host (used by tests and mirrors).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("scholarcrawl/{} (mailto:{})", env!("CARGO_PKG_VERSION"), POLITE_EMAIL))
            .build()
            .map_err(|e| CrawlerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl SearchProvider for OpenAlex {
    fn name(&self) -> &str {
        "OpenAlex"
    }

    async fn search(&self, query: &str, n: usize) -> Result<Vec<RawMetadata>> {
        info!(query = query, requested = n, "Starting OpenAlex query");

        let per_page = n.clamp(1, MAX_PER_PAGE);
        let mut collector = ResultCollector::new(n);
        let mut page = 1;

        while !collector.is_full() {
            let url = build_search_url(&self.base_url, query, page, per_page);
            debug!(url = %url, page = page, "Fetching OpenAlex page");

            let body = fetch_page(&self.client, &url).await?;
            let (works, total) = parse_response(&body)?;
            if works.is_empty() {
                debug!(page = page, total = total, "No more results");
                break;
            }

            let kept = collector.extend(works);
            info!(page = page, kept = kept, total = collector.len(), "Parsed OpenAlex results");
            if (page * per_page) as i64 >= total {
                break;
            }
            page += 1;
        }

        collector.finish()
    }
}

/// OpenAlex API response structures
#[derive(Debug, Deserialize)]
struct OpenAlexResponse {
    meta: OpenAlexMeta,
    results: Vec<OpenAlexWork>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexMeta {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    title: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i32>,
    doi: Option<String>,
    cited_by_count: Option<i64>,
    primary_location: Option<OpenAlexLocation>,
    best_oa_location: Option<OpenAlexLocation>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexLocation {
    source: Option<OpenAlexSource>,
    landing_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexSource {
    display_name: Option<String>,
}

/// Build OpenAlex API search URL
fn build_search_url(base_url: &str, query: &str, page: usize, per_page: usize) -> String {
    format!(
        "{}/works?search={}&per-page={}&page={}&mailto={}&select=title,display_name,publication_year,doi,cited_by_count,primary_location,best_oa_location",
        base_url,
        urlencoding::encode(query),
        per_page,
        page,
        POLITE_EMAIL
    )
}

/// Fetch page content from OpenAlex API
async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let mut retries = 0;

    loop {
        let response = client.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.text().await?);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if retries < MAX_RETRIES {
                let backoff = Duration::from_secs(2u64.pow(retries));
                warn!(
                    retries = retries,
                    backoff_secs = backoff.as_secs(),
                    "Rate limited, backing off"
                );
                tokio::time::sleep(backoff).await;
                retries += 1;
                continue;
            }
            return Err(CrawlerError::RateLimited(60));
        }

        return Err(CrawlerError::Api {
            code: status.as_u16() as i32,
            message: format!("OpenAlex API error: {}", status),
        });
    }
}

/// Parse one OpenAlex page into raw metadata plus the backend's total count.
fn parse_response(json_str: &str) -> Result<(Vec<RawMetadata>, i64)> {
    let response: OpenAlexResponse = serde_json::from_str(json_str)
        .map_err(|e| CrawlerError::Parse(format!("Failed to parse OpenAlex response: {}", e)))?;

    let results = response
        .results
        .into_iter()
        .map(|work| {
            let venue = work
                .primary_location
                .as_ref()
                .and_then(|l| l.source.as_ref())
                .and_then(|s| s.display_name.clone())
                .unwrap_or_default();

            // Landing page, then best OA location, then the DOI resolver
            let url = work
                .primary_location
                .and_then(|l| l.landing_page_url)
                .or_else(|| work.best_oa_location.and_then(|l| l.landing_page_url))
                .or(work.doi)
                .unwrap_or_default();

            RawMetadata {
                url,
                title: work.display_name.or(work.title).unwrap_or_default(),
                year: work.publication_year.map(|y| y.to_string()),
                citations: work.cited_by_count.map(|c| c.to_string()),
                venue,
            }
        })
        .collect();

    Ok((results, response.meta.count))
}
