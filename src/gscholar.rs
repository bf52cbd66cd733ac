//! Google Scholar search provider.
//!
//! Pages through the Google Scholar results HTML, ten results per page, and
//! parses each result item into [`RawMetadata`]. Session cookies are loaded
//! from the cookie file to reduce CAPTCHA challenges.

use crate::cookies::{Cookie, CookieManager};
use crate::error::{CrawlerError, OptionExt, Result};
use crate::record::RawMetadata;
use crate::search::{ResultCollector, SearchProvider};
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// User agent string for requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Results per Google Scholar page
const PAGE_SIZE: usize = 10;

/// Google Scholar serves at most 1000 results per query
const MAX_PAGES: usize = 100;

/// Options for the Google Scholar provider
#[derive(Debug, Clone, Default)]
pub struct ScholarOptions {
    /// Proxy URL (e.g., "http://127.0.0.1:7890")
    pub proxy: Option<String>,
    /// Custom base URL for mirror sites
    pub base_url: Option<String>,
    /// Cookie file; `~/.gscholar_cookies.json` when unset
    pub cookie_file: Option<std::path::PathBuf>,
}

/// Google Scholar backend.
pub struct GoogleScholar {
    client: reqwest::Client,
    base_url: String,
    cookie_header: String,
}

impl GoogleScholar {
    /// Build the provider: HTTP client, base URL and cookie header.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Config`] if the proxy URL is invalid.
    pub fn new(options: &ScholarOptions) -> Result<Self> {
        let base_url = options
            .base_url
            .as_ref()
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SCHOLAR_URL.to_string());

        let cookie_manager = match &options.cookie_file {
            Some(path) => CookieManager::with_path(path.clone()),
            None => CookieManager::default(),
        };
        let cookies = cookie_manager.load();
        if cookies.is_empty() {
            warn!(path = ?cookie_manager.path(), "No cookies loaded, Google Scholar may serve a CAPTCHA");
        } else {
            info!("Loaded {} cookies for Google Scholar", cookies.len());
        }

        Ok(Self {
            client: build_http_client(options.proxy.as_deref())?,
            base_url,
            cookie_header: build_cookie_header(&cookies),
        })
    }

    /// Fetch and parse one results page starting at offset `start`.
    async fn fetch_results_page(&self, query: &str, start: usize) -> Result<Vec<RawMetadata>> {
        let url = build_search_url(&self.base_url, query, start)?;
        debug!(start = start, url = %url, "Fetching results page");

        let html = fetch_page_with_cookies(&self.client, &url, &self.cookie_header).await?;
        if html.contains("Solving the above CAPTCHA") || html.contains("unusual traffic") {
            warn!(start = start, "CAPTCHA detected");
            return Err(CrawlerError::Captcha);
        }

        parse_result_items(&html, &url)
    }
}

impl SearchProvider for GoogleScholar {
    fn name(&self) -> &str {
        "Google Scholar"
    }

    async fn search(&self, query: &str, n: usize) -> Result<Vec<RawMetadata>> {
        info!(query = query, url = %self.base_url, requested = n, "Starting Google Scholar query");

        let mut collector = ResultCollector::new(n);

        for page in 0..MAX_PAGES {
            if collector.is_full() {
                break;
            }

            if page > 0 {
                // Random delay between pages to avoid detection
                let delay = rand::random::<u64>() % 1500 + 500;
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let items = self.fetch_results_page(query, page * PAGE_SIZE).await?;
            if items.is_empty() {
                debug!(page = page + 1, "No more results");
                break;
            }

            let kept = collector.extend(items);
            info!(page = page + 1, kept = kept, total = collector.len(), "Parsed results");
        }

        collector.finish()
    }
}

/// Build cookie header string from cookie list
fn build_cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .filter(|c| c.domain.contains("google"))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Build HTTP client with optional proxy
fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .cookie_store(true);

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            CrawlerError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| CrawlerError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Build Google Scholar search URL
fn build_search_url(base_url: &str, query: &str, start: usize) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/scholar", base_url))
        .map_err(|e| CrawlerError::Config(format!("Invalid base URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("hl", "en-US") // Force English locale for consistent parsing
        .append_pair("start", &start.to_string());

    Ok(url)
}

/// Fetch page content using HTTP client with cookies
async fn fetch_page_with_cookies(client: &reqwest::Client, url: &Url, cookie_header: &str) -> Result<String> {
    let mut request = client
        .get(url.as_str())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "no-cache");

    if !cookie_header.is_empty() {
        request = request.header("Cookie", cookie_header);
    }

    let response = request.send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(CrawlerError::RateLimited(60));
    }

    if !status.is_success() {
        return Err(CrawlerError::Api {
            code: status.as_u16() as i32,
            message: format!("HTTP error: {}", status),
        });
    }

    Ok(response.text().await?)
}

/// Absolute form of a result link; unresolvable links become empty.
fn resolve_link(page_url: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match page_url.join(href) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!(href = href, error = %e, "Unresolvable result link");
            String::new()
        }
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CrawlerError::Parse(e.to_string()))
}

/// Parse Google Scholar HTML into raw result metadata.
///
/// Items without a title are skipped. Items without a link keep an empty URL
/// and are dropped later by the result collector. Relative links are resolved
/// against `page_url`, the results page they came from.
pub fn parse_result_items(html: &str, page_url: &Url) -> Result<Vec<RawMetadata>> {
    let document = Html::parse_document(html);

    let item_selector = selector("div.gs_r.gs_or.gs_scl")?;
    let title_selector = selector("h3.gs_rt")?;
    let link_selector = selector("h3.gs_rt a")?;
    let meta_selector = selector("div.gs_a")?;
    let cite_selector = selector("div.gs_fl a")?;

    let year_regex = Regex::new(r"\b(19|20)\d{2}\b").map_err(|e| CrawlerError::Parse(e.to_string()))?;
    let cite_regex = Regex::new(r"Cited by\s*(\d+)").map_err(|e| CrawlerError::Parse(e.to_string()))?;

    let mut results = Vec::new();

    for item in document.select(&item_selector) {
        let mut data = RawMetadata::default();

        if let Some(link) = item.select(&link_selector).next() {
            data.title = link.text().collect::<String>().trim().to_string();
            data.url = resolve_link(page_url, link.value().attr("href").unwrap_or(""));
        } else if let Some(title_elem) = item.select(&title_selector).next() {
            data.title = title_elem.text().collect::<String>().trim().to_string();
        }

        // "Authors - Venue, Year - Publisher"
        if let Some(meta_elem) = item.select(&meta_selector).next() {
            let meta_text = meta_elem.text().collect::<String>();
            if let Some(venue_year) = meta_text.split(" - ").nth(1) {
                match year_regex.find(venue_year) {
                    Some(year) => {
                        data.year = Some(year.as_str().to_string());
                        data.venue = venue_year[..year.start()].trim().trim_end_matches(',').to_string();
                    }
                    None => data.venue = venue_year.trim().to_string(),
                }
            }
        }

        for link in item.select(&cite_selector) {
            let href = link.value().attr("href").unwrap_or("");
            if !href.contains("cites=") {
                continue;
            }
            let text = link.text().collect::<String>();
            if let Some(caps) = cite_regex.captures(&text) {
                data.citations = Some(caps.get(1).ok_or_parse("citation capture")?.as_str().to_string());
                break;
            }
        }

        if !data.title.is_empty() {
            results.push(data);
        }
    }

    Ok(results)
}
