//! scholarcrawl - Academic search crawler
//!
//! Searches an academic search engine, crawls each result's landing page and
//! writes the pages that pass the keyword, period, domain and citation filters,
//! ranked by keyword score.
//!
//! ## Usage
//!
//! ```bash
//! scholarcrawl -q "antimicrobial peptides" -kw "peptide, molecular dynamics" \
//!     -n 20 -p 2010-2020 -d "nature.com science.org" -c 10 -o results.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scholarcrawl::config::{CrawlerConfig, FetchPolicy, KeywordScope, SortOrder};
use scholarcrawl::fetcher::HttpPageFetcher;
use scholarcrawl::gscholar::{GoogleScholar, ScholarOptions};
use scholarcrawl::openalex::OpenAlex;
use scholarcrawl::pipeline::{Pipeline, Stage};
use scholarcrawl::search::SearchProvider;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Crawl academic search results and rank them by keyword relevance
#[derive(Parser, Debug)]
#[command(name = "scholarcrawl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// The query you want to search
    #[arg(short, long)]
    query: String,

    /// The keywords of interest, comma or space separated (also accepted as -kw)
    #[arg(short, long)]
    keywords: String,

    /// Exact number of search results to crawl
    #[arg(short, long)]
    number: usize,

    /// Time period to filter for, exclusive bounds (e.g. "2010-2020" or "2010 2020")
    #[arg(short, long)]
    period: Option<String>,

    /// Domain names to filter for, space separated (e.g. "nature.com science.org")
    #[arg(short, long)]
    domains: Option<String>,

    /// Minimum number of citations, inclusive
    #[arg(short, long)]
    citations: Option<String>,

    /// Output file name
    #[arg(short, long)]
    output: PathBuf,

    /// Search backend
    #[arg(long, value_enum, default_value_t = Source::Scholar)]
    source: Source,

    /// Proxy URL for Google Scholar (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    proxy: Option<String>,

    /// Google Scholar mirror site URL
    #[arg(long)]
    mirror: Option<String>,

    /// Google Scholar cookie file (default: ~/.gscholar_cookies.json)
    #[arg(long)]
    cookie_file: Option<PathBuf>,

    /// Page fetch timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Extra attempts for a page fetch that failed with a transient error
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Rank lowest score first
    #[arg(long)]
    ascending: bool,

    /// Score keywords against the whole page instead of its "Keywords" line
    #[arg(long)]
    whole_page: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Google Scholar
    Scholar,
    /// OpenAlex works API
    Openalex,
}

/// Map the two-letter `-kw` flag onto `--keywords`, which clap can parse.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-kw") => OsString::from("--keywords"),
            Some(s) if s.starts_with("-kw=") => OsString::from(format!("--keywords={}", &s[4..])),
            _ => arg,
        })
        .collect()
}

impl Cli {
    /// Validate flags into the immutable run configuration.
    fn to_config(&self) -> Result<CrawlerConfig> {
        let sort_order = if self.ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        };
        let keyword_scope = if self.whole_page {
            KeywordScope::WholePage
        } else {
            KeywordScope::KeywordLine
        };
        let fetch = FetchPolicy::new(Duration::from_secs(self.timeout), self.retries)
            .context("Invalid --timeout or --retries")?;

        let config = CrawlerConfig::new(&self.query, &self.keywords, self.number, &self.output)
            .context("Invalid --query or --keywords")?
            .with_period(self.period.as_deref())
            .with_context(|| format!("Invalid --period {:?}", self.period))?
            .with_domains(self.domains.as_deref())
            .with_context(|| format!("Invalid --domains {:?}", self.domains))?
            .with_min_citations(self.citations.as_deref())
            .with_context(|| format!("Invalid --citations {:?}", self.citations))?
            .with_sort_order(sort_order)
            .with_keyword_scope(keyword_scope)
            .with_fetch_policy(fetch);

        Ok(config)
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let config = cli.to_config()?;
    let fetcher = HttpPageFetcher::new(config.fetch);

    match cli.source {
        Source::Scholar => {
            let options = ScholarOptions {
                proxy: cli.proxy.clone(),
                base_url: cli.mirror.clone(),
                cookie_file: cli.cookie_file.clone(),
            };
            let provider = GoogleScholar::new(&options).context("Failed to set up Google Scholar")?;
            run_crawl(Pipeline::new(config, provider, fetcher)?).await
        }
        Source::Openalex => {
            let provider = OpenAlex::new().context("Failed to set up OpenAlex")?;
            run_crawl(Pipeline::new(config, provider, fetcher)?).await
        }
    }
}

// ============================================================================
// Crawl Pipeline
// ============================================================================

async fn run_crawl<P: SearchProvider>(pipeline: Pipeline<P, HttpPageFetcher>) -> Result<()> {
    let config = pipeline.config();

    // ===========================================
    // STAGE 1: Search
    // ===========================================
    println!("\nSearching {} ...\n", pipeline.provider_name());

    let records = pipeline.search().await.with_context(|| {
        format!(
            "Search stage failed for query '{}' ({} results requested from {})",
            config.query,
            config.number,
            pipeline.provider_name()
        )
    })?;
    println!("Found {} results.", records.len());

    // ===========================================
    // STAGE 2: Crawl & Score
    // ===========================================
    println!("\nCrawling ....\n");

    let records = pipeline.crawl(records).await;
    let fetched = records.iter().filter(|r| r.has_content()).count();
    println!("Fetched {} / {} pages.", fetched, records.len());

    // ===========================================
    // STAGE 3: Filters
    // ===========================================
    let (records, reports) = pipeline
        .filter(records)
        .with_context(|| format!("Filter stage failed for query '{}'", config.query))?;

    for report in &reports {
        let label = match report.stage {
            Stage::Content => "Dropping pages without content",
            Stage::Keyword => "Filtering by keywords",
            Stage::Period => "Filtering by period",
            Stage::Domain => "Filtering by domain",
            Stage::Citation => "Filtering by citations",
        };
        println!("\n{} ... kept {}, dropped {}", label, report.kept, report.dropped);
    }

    // ===========================================
    // STAGE 4: Rank & Write
    // ===========================================
    let ranked = pipeline.rank(records);
    pipeline
        .write(&ranked)
        .with_context(|| format!("Output stage failed writing {}", config.output.display()))?;

    info!(count = ranked.len(), output = %config.output.display(), "Crawl complete");
    println!("\nDone! {} results written to {}", ranked.len(), config.output.display());
    Ok(())
}
