//! Page fetcher.
//!
//! Turns a publication URL into the text content of its landing page. Every
//! call runs inside its own [`FetchSession`], which is released when the call
//! returns, whichever way it returns.

use crate::config::FetchPolicy;
use crate::error::{CrawlerError, Result};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use std::time::Duration;
use tracing::{debug, warn};

/// User agent string for page requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Subtrees that never contribute visible text
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// Elements that start a new line of text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Landing page fetcher.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    /// Return the text content of the page at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::Fetch`] when the page cannot be retrieved or
    /// yields no text. Callers treat this as "no content" for the record.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Fetches pages over HTTP and extracts their text with `scraper`.
#[derive(Debug, Clone, Default)]
pub struct HttpPageFetcher {
    policy: FetchPolicy,
}

impl HttpPageFetcher {
    pub fn new(policy: FetchPolicy) -> Self {
        Self { policy }
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let session = FetchSession::open(url, &self.policy)?;
        let mut backoff = self.policy.initial_backoff;

        for attempt in 0..=self.policy.retries {
            match session.render().await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.policy.retries && is_retryable(&e) => {
                    warn!(
                        url = url,
                        attempt = attempt + 1,
                        wait_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(CrawlerError::fetch(url, e)),
            }
        }

        Err(CrawlerError::fetch(url, "retries exhausted"))
    }
}

/// One scoped page session: an HTTP client bound to a single URL.
///
/// Dropping the session drops its `reqwest::Client` field, which closes the
/// connection pool. The `Drop` impl below only logs the release.
struct FetchSession<'a> {
    url: &'a str,
    client: reqwest::Client,
}

impl<'a> FetchSession<'a> {
    fn open(url: &'a str, policy: &FetchPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(policy.timeout)
            .connect_timeout(policy.timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| CrawlerError::fetch(url, format!("failed to open session: {}", e)))?;
        debug!(url = url, "Session opened");
        Ok(Self { url, client })
    }

    /// Request the page and extract its text.
    async fn render(&self) -> Result<String> {
        let response = self
            .client
            .get(self.url)
            .header("Accept", "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.5")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

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

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();
        let body = response.text().await?;

        let text = if content_type.starts_with("text/plain") {
            body
        } else if content_type.contains("html") || content_type.contains("xml") {
            html_to_text(&body)
        } else {
            return Err(CrawlerError::Parse(format!(
                "unsupported content type '{}'",
                content_type
            )));
        };

        if text.trim().is_empty() {
            return Err(CrawlerError::Parse("page has no text".to_string()));
        }
        Ok(text)
    }
}

impl Drop for FetchSession<'_> {
    fn drop(&mut self) {
        debug!(url = self.url, "Session released");
    }
}

/// Transport failures and server-side errors are worth another attempt.
fn is_retryable(error: &CrawlerError) -> bool {
    match error {
        CrawlerError::Network(_) | CrawlerError::RateLimited(_) => true,
        CrawlerError::Api { code, .. } => *code >= 500,
        _ => false,
    }
}

/// Extract visible text from an HTML document, one line per block element.
///
/// Whitespace inside a line is collapsed and blank lines are dropped.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}
