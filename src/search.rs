//! Search provider contract.
//!
//! A provider turns a free-text query into exactly `n` raw publication
//! records. Running out of results before `n` is a hard failure
//! ([`CrawlerError::ProviderExhaustion`]); partial result sets are never
//! returned.

use crate::error::{CrawlerError, Result};
use crate::record::RawMetadata;

/// Academic search backend.
#[allow(async_fn_in_trait)]
pub trait SearchProvider {
    /// Short name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Return exactly `n` results for `query`, in backend rank order.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::ProviderExhaustion`] when fewer than `n` usable
    /// results exist, or a transport error if the backend cannot be reached.
    async fn search(&self, query: &str, n: usize) -> Result<Vec<RawMetadata>>;
}

/// Accumulates backend pages until `n` usable results are collected.
///
/// Results without a URL cannot be crawled and are skipped.
#[derive(Debug)]
pub struct ResultCollector {
    requested: usize,
    results: Vec<RawMetadata>,
}

impl ResultCollector {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            results: Vec::new(),
        }
    }

    /// Add one page of results. Returns the number actually kept.
    pub fn extend(&mut self, page: impl IntoIterator<Item = RawMetadata>) -> usize {
        let before = self.results.len();
        let remaining = self.requested - before;
        self.results.extend(
            page.into_iter()
                .filter(|r| !r.url.trim().is_empty())
                .take(remaining),
        );
        self.results.len() - before
    }

    pub fn is_full(&self) -> bool {
        self.results.len() >= self.requested
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Finish collection, failing if the backend ran dry early.
    pub fn finish(self) -> Result<Vec<RawMetadata>> {
        if self.is_full() {
            Ok(self.results)
        } else {
            Err(CrawlerError::ProviderExhaustion {
                requested: self.requested,
                found: self.results.len(),
            })
        }
    }
}
