//! The crawl pipeline.
//!
//! search → fetch page → extract signals → filter → rank → write.
//!
//! Records are processed one at a time in provider order. Filter stages run
//! in a fixed order, each a pure pass that only removes records; optional
//! stages are skipped when their configuration value is absent.

use crate::config::{CrawlerConfig, DomainList, KeywordScope, Period};
use crate::error::Result;
use crate::extract::{self, KeywordScorer};
use crate::fetcher::PageFetcher;
use crate::output;
use crate::progress;
use crate::rank;
use crate::record::Record;
use crate::search::SearchProvider;
use std::fmt;
use tracing::{debug, info, warn};

/// Filter stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Content,
    Keyword,
    Period,
    Domain,
    Citation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Content => "content",
            Stage::Keyword => "keywords",
            Stage::Period => "period",
            Stage::Domain => "domain",
            Stage::Citation => "citations",
        };
        f.write_str(name)
    }
}

/// Outcome of one filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub kept: usize,
    pub dropped: usize,
}

/// One crawler run over a search provider and a page fetcher.
pub struct Pipeline<P, F> {
    config: CrawlerConfig,
    provider: P,
    fetcher: F,
    scorer: KeywordScorer,
}

impl<P: SearchProvider, F: PageFetcher> Pipeline<P, F> {
    /// Create a pipeline. Keyword patterns are compiled here, once per run.
    pub fn new(config: CrawlerConfig, provider: P, fetcher: F) -> Result<Self> {
        let scorer = KeywordScorer::new(&config.keywords)?;
        Ok(Self {
            config,
            provider,
            fetcher,
            scorer,
        })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Request exactly `number` results and wrap each in a [`Record`].
    ///
    /// # Errors
    ///
    /// Fails on provider exhaustion or any search transport error.
    pub async fn search(&self) -> Result<Vec<Record>> {
        let spinner = progress::spinner(format!("Searching {}", self.provider.name()));
        let results = self.provider.search(&self.config.query, self.config.number).await;
        spinner.finish_and_clear();

        let records: Vec<Record> = results?.into_iter().map(Record::from).collect();
        info!(count = records.len(), provider = self.provider.name(), "Search complete");
        Ok(records)
    }

    /// Fetch every record's page in turn and score it.
    ///
    /// A failed fetch leaves the record without page text; it is removed
    /// later by the content gate.
    pub async fn crawl(&self, records: Vec<Record>) -> Vec<Record> {
        let bar = progress::bar(records.len(), "Crawling");
        let mut crawled = Vec::with_capacity(records.len());

        for mut record in records {
            match self.fetcher.fetch_text(record.source_url()).await {
                Ok(text) => record.page_text = Some(text),
                Err(e) => warn!(url = record.source_url(), error = %e, "Page fetch failed"),
            }
            self.score(&mut record);
            bar.inc(1);
            crawled.push(record);
        }

        bar.finish_and_clear();
        crawled
    }

    /// Extract the keyword line and set the normalized keyword score.
    ///
    /// Records without page text are left untouched.
    pub fn score(&self, record: &mut Record) {
        let Some(text) = record.page_text.as_deref() else {
            return;
        };

        record.keyword_line = extract::keyword_line(text).map(str::to_string);

        let haystack = match self.config.keyword_scope {
            KeywordScope::KeywordLine => record.keyword_line.as_deref(),
            KeywordScope::WholePage => Some(text),
        };
        if let Some(haystack) = haystack {
            let matches = self.scorer.count_matches(haystack);
            record.priority_score = rank::normalize_score(matches);
            debug!(url = record.source_url(), matches = matches, "Scored record");
        }
    }

    /// Run every enabled filter stage in order.
    ///
    /// # Errors
    ///
    /// Fails when a provider citation count is malformed.
    pub fn filter(&self, records: Vec<Record>) -> Result<(Vec<Record>, Vec<StageReport>)> {
        let mut reports = Vec::new();

        let records = track(Stage::Content, records, &mut reports, content_gate);

        let require_line = self.config.keyword_scope == KeywordScope::KeywordLine;
        let mut records = track(Stage::Keyword, records, &mut reports, |r| keyword_gate(r, require_line));

        if let Some(period) = &self.config.period {
            records = track(Stage::Period, records, &mut reports, |r| period_gate(r, period));
        }

        if let Some(domains) = &self.config.domains {
            records = track(Stage::Domain, records, &mut reports, |r| domain_gate(r, domains));
        }

        if let Some(minimum) = self.config.min_citations {
            let before = records.len();
            records = citation_gate(records, minimum)?;
            reports.push(report(Stage::Citation, before, records.len()));
        }

        Ok((records, reports))
    }

    /// Sort the surviving records in the configured direction.
    pub fn rank(&self, records: Vec<Record>) -> Vec<Record> {
        rank::rank(records, self.config.sort_order)
    }

    /// Write the ranked records to the configured output path.
    pub fn write(&self, records: &[Record]) -> Result<()> {
        output::write_results(&self.config.output, records)
    }
}

fn report(stage: Stage, before: usize, after: usize) -> StageReport {
    info!(stage = %stage, kept = after, dropped = before - after, "Filter stage complete");
    StageReport {
        stage,
        kept: after,
        dropped: before - after,
    }
}

fn track(
    stage: Stage,
    records: Vec<Record>,
    reports: &mut Vec<StageReport>,
    gate: impl FnOnce(Vec<Record>) -> Vec<Record>,
) -> Vec<Record> {
    let before = records.len();
    let records = gate(records);
    reports.push(report(stage, before, records.len()));
    records
}

/// Drop records whose page fetch produced no text.
pub fn content_gate(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().filter(Record::has_content).collect()
}

/// Drop records without a keyword line, when one is required.
pub fn keyword_gate(records: Vec<Record>, require_keyword_line: bool) -> Vec<Record> {
    if !require_keyword_line {
        return records;
    }
    records
        .into_iter()
        .filter(|r| r.keyword_line.is_some())
        .collect()
}

/// Resolve each record's year and keep those strictly inside `period`.
pub fn period_gate(records: Vec<Record>, period: &Period) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut record| {
            record.publication_year =
                extract::publication_year(record.raw_metadata(), record.page_text.as_deref());
            record.in_period = record
                .publication_year
                .map(|year| extract::in_period(year, period));
            record
        })
        .filter(|r| r.in_period == Some(true))
        .collect()
}

/// Tag each record's domain and keep those matching a configured domain.
pub fn domain_gate(records: Vec<Record>, domains: &DomainList) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut record| {
            record.domain_tag = extract::domain_tag(record.source_url(), domains);
            record
        })
        .filter(|r| r.domain_tag.is_some())
        .collect()
}

/// Read each record's citation count and keep those at or above `minimum`.
///
/// # Errors
///
/// Returns a parse error if a provider citation count is not a number.
pub fn citation_gate(records: Vec<Record>, minimum: u64) -> Result<Vec<Record>> {
    let mut kept = Vec::with_capacity(records.len());
    for mut record in records {
        record.citation_count = extract::citation_count(record.raw_metadata())?;
        record.meets_citation_floor = record
            .citation_count
            .map(|count| extract::meets_citation_floor(count, minimum));
        if record.meets_citation_floor == Some(true) {
            kept.push(record);
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawMetadata;

    fn record(url: &str, text: Option<&str>) -> Record {
        let mut record = Record::new(RawMetadata {
            url: url.to_string(),
            ..Default::default()
        });
        record.page_text = text.map(str::to_string);
        record
    }

    fn with_meta(url: &str, year: Option<&str>, citations: Option<&str>) -> Record {
        let mut record = Record::new(RawMetadata {
            url: url.to_string(),
            year: year.map(str::to_string),
            citations: citations.map(str::to_string),
            ..Default::default()
        });
        record.page_text = Some("text".to_string());
        record
    }

    fn urls(records: &[Record]) -> Vec<&str> {
        records.iter().map(Record::source_url).collect()
    }

    #[test]
    fn test_content_gate_drops_missing_text() {
        let kept = content_gate(vec![
            record("a", Some("page")),
            record("b", None),
            record("c", Some("   ")),
        ]);
        assert_eq!(urls(&kept), vec!["a"]);
        assert!(kept.iter().all(|r| r.page_text.is_some()));
    }

    #[test]
    fn test_keyword_gate() {
        let mut with_line = record("a", Some("Keywords: x"));
        with_line.keyword_line = Some("Keywords: x".to_string());
        let without_line = record("b", Some("nothing"));

        let kept = keyword_gate(vec![with_line.clone(), without_line.clone()], true);
        assert_eq!(urls(&kept), vec!["a"]);

        let kept = keyword_gate(vec![with_line, without_line], false);
        assert_eq!(urls(&kept), vec!["a", "b"]);
    }

    #[test]
    fn test_period_gate_exclusive_bounds() {
        let period = Period { low: 2010, high: 2020 };
        let kept = period_gate(
            vec![
                with_meta("in", Some("2015"), None),
                with_meta("edge", Some("2020"), None),
                with_meta("unknown", None, None),
            ],
            &period,
        );
        assert_eq!(urls(&kept), vec!["in"]);
        assert_eq!(kept[0].publication_year, Some(2015));
        assert_eq!(kept[0].in_period, Some(true));
    }

    #[test]
    fn test_period_gate_uses_copyright_fallback() {
        let period = Period { low: 2010, high: 2020 };
        let mut fallback = record("page", Some("Intro\nCopyright (c) 2012 ACS"));
        fallback.keyword_line = None;
        let kept = period_gate(vec![fallback], &period);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].publication_year, Some(2012));
    }

    #[test]
    fn test_domain_gate() -> Result<()> {
        let domains = DomainList::parse("nature.com science.org")?;
        let kept = domain_gate(
            vec![
                record("https://www.nature.com/articles/123", Some("t")),
                record("https://arxiv.org/abs/1", Some("t")),
            ],
            &domains,
        );
        assert_eq!(urls(&kept), vec!["https://www.nature.com/articles/123"]);
        assert_eq!(kept[0].domain_tag.as_deref(), Some("nature.com"));
        Ok(())
    }

    #[test]
    fn test_citation_gate_inclusive_floor() -> Result<()> {
        let kept = citation_gate(
            vec![
                with_meta("ten", None, Some("10")),
                with_meta("nine", None, Some("9")),
                with_meta("none", None, None),
            ],
            10,
        )?;
        assert_eq!(urls(&kept), vec!["ten"]);
        assert_eq!(kept[0].meets_citation_floor, Some(true));
        Ok(())
    }

    #[test]
    fn test_citation_gate_rejects_malformed_count() {
        let result = citation_gate(vec![with_meta("bad", None, Some("lots"))], 1);
        assert!(result.is_err());
    }
}
