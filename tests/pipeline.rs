//! End-to-end crawl runs against in-memory search and page backends.

use scholarcrawl::config::{CrawlerConfig, KeywordScope, SortOrder};
use scholarcrawl::fetcher::PageFetcher;
use scholarcrawl::output;
use scholarcrawl::pipeline::{Pipeline, Stage};
use scholarcrawl::record::RawMetadata;
use scholarcrawl::search::{ResultCollector, SearchProvider};
use scholarcrawl::{CrawlerError, Result};
use std::collections::HashMap;
use tempfile::TempDir;

struct FakeProvider {
    results: Vec<RawMetadata>,
}

impl SearchProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(&self, _query: &str, n: usize) -> Result<Vec<RawMetadata>> {
        let mut collector = ResultCollector::new(n);
        collector.extend(self.results.iter().cloned());
        collector.finish()
    }
}

struct FakeFetcher {
    pages: HashMap<String, String>,
}

impl PageFetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlerError::fetch(url, "connection refused"))
    }
}

fn meta(url: &str, year: Option<&str>, citations: Option<&str>) -> RawMetadata {
    RawMetadata {
        url: url.to_string(),
        title: format!("Paper at {}", url),
        year: year.map(str::to_string),
        citations: citations.map(str::to_string),
        venue: String::new(),
    }
}

/// Five results: three with keyword lines, one without, one unreachable.
fn fixtures() -> (FakeProvider, FakeFetcher) {
    let provider = FakeProvider {
        results: vec![
            meta("https://www.nature.com/articles/1", Some("2015"), Some("40")),
            meta("https://www.science.org/doi/2", Some("2012"), Some("3")),
            meta("https://journals.example.org/3", None, Some("10")),
            meta("https://www.nature.com/articles/4", Some("2018"), Some("12")),
            meta("https://offline.example.org/5", Some("2016"), Some("99")),
        ],
    };

    let pages = [
        (
            "https://www.nature.com/articles/1",
            "Antimicrobial peptides\nKeywords: Antimicrobial Peptide, Molecular Dynamics\nCopyright 2015",
        ),
        (
            "https://www.science.org/doi/2",
            "Membranes\nKEYWORDS: membrane, peptide\nCopyright 2012",
        ),
        (
            "https://journals.example.org/3",
            "Dynamics of things\nKeywords: molecular, simulation, peptide\n© Copyright 2021 Example",
        ),
        (
            "https://www.nature.com/articles/4",
            "A page without a keyword section mentioning peptide and molecular",
        ),
    ];

    let fetcher = FakeFetcher {
        pages: pages
            .iter()
            .map(|(url, text)| (url.to_string(), text.to_string()))
            .collect(),
    };

    (provider, fetcher)
}

fn config(dir: &TempDir) -> Result<CrawlerConfig> {
    CrawlerConfig::new(
        "antimicrobial peptides",
        "peptide, molecular",
        5,
        dir.path().join("results.txt"),
    )
}

async fn run<P: SearchProvider, F: PageFetcher>(pipeline: &Pipeline<P, F>) -> Result<String> {
    let records = pipeline.crawl(pipeline.search().await?).await;
    let (records, _) = pipeline.filter(records)?;
    pipeline.write(&pipeline.rank(records))?;
    Ok(std::fs::read_to_string(&pipeline.config().output)?)
}

#[tokio::test]
async fn test_no_optional_filters() -> Result<()> {
    let dir = TempDir::new()?;
    let (provider, fetcher) = fixtures();
    let pipeline = Pipeline::new(config(&dir)?, provider, fetcher)?;

    let contents = run(&pipeline).await?;
    assert_eq!(
        contents,
        "#url, #score\n\
         https://www.nature.com/articles/1,  2\n\n\
         https://journals.example.org/3,  2\n\n\
         https://www.science.org/doi/2,  1\n\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_stage_reports() -> Result<()> {
    let dir = TempDir::new()?;
    let (provider, fetcher) = fixtures();
    let config = config(&dir)?
        .with_period(Some("2010-2020"))?
        .with_domains(Some("nature.com science.org"))?
        .with_min_citations(Some("10"))?;
    let pipeline = Pipeline::new(config, provider, fetcher)?;

    let records = pipeline.crawl(pipeline.search().await?).await;
    assert_eq!(records.len(), 5);
    assert!(records[4].page_text.is_none());

    let (records, reports) = pipeline.filter(records)?;
    let summary: Vec<(Stage, usize, usize)> = reports
        .iter()
        .map(|r| (r.stage, r.kept, r.dropped))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Stage::Content, 4, 1),
            (Stage::Keyword, 3, 1),
            (Stage::Period, 2, 1),
            (Stage::Domain, 2, 0),
            (Stage::Citation, 1, 1),
        ]
    );

    assert_eq!(records.len(), 1);
    let survivor = &records[0];
    assert_eq!(survivor.source_url(), "https://www.nature.com/articles/1");
    assert_eq!(survivor.priority_score, 2);
    assert_eq!(survivor.publication_year, Some(2015));
    assert_eq!(survivor.in_period, Some(true));
    assert_eq!(survivor.domain_tag.as_deref(), Some("nature.com"));
    assert_eq!(survivor.citation_count, Some(40));
    assert_eq!(survivor.meets_citation_floor, Some(true));
    Ok(())
}

#[tokio::test]
async fn test_whole_page_scoring_keeps_pages_without_keyword_line() -> Result<()> {
    let dir = TempDir::new()?;
    let (provider, fetcher) = fixtures();
    let config = config(&dir)?
        .with_keyword_scope(KeywordScope::WholePage)
        .with_sort_order(SortOrder::Ascending);
    let pipeline = Pipeline::new(config, provider, fetcher)?;

    let contents = run(&pipeline).await?;
    let urls: Vec<&str> = contents
        .lines()
        .skip(1)
        .filter(|l| !l.is_empty())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://www.science.org/doi/2,  1",
            "https://www.nature.com/articles/1,  2",
            "https://journals.example.org/3,  2",
            "https://www.nature.com/articles/4,  2",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_provider_exhaustion_aborts() -> Result<()> {
    let dir = TempDir::new()?;
    let (provider, fetcher) = fixtures();
    let config = CrawlerConfig::new("q", "peptide", 8, dir.path().join("results.txt"))?;
    let pipeline = Pipeline::new(config, provider, fetcher)?;

    match pipeline.search().await {
        Err(CrawlerError::ProviderExhaustion { requested, found }) => {
            assert_eq!(requested, 8);
            assert_eq!(found, 5);
        }
        other => panic!("expected exhaustion, got {:?}", other.map(|r| r.len())),
    }
    assert!(!pipeline.config().output.exists());
    Ok(())
}

#[tokio::test]
async fn test_output_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let (provider, fetcher) = fixtures();
    let pipeline = Pipeline::new(config(&dir)?, provider, fetcher)?;

    let records = pipeline.crawl(pipeline.search().await?).await;
    let (records, _) = pipeline.filter(records)?;
    let ranked = pipeline.rank(records);

    assert_eq!(output::render(&ranked), output::render(&ranked));
    pipeline.write(&ranked)?;
    let first = std::fs::read(&pipeline.config().output)?;
    pipeline.write(&ranked)?;
    let second = std::fs::read(&pipeline.config().output)?;
    assert_eq!(first, second);
    Ok(())
}
