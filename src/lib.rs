//! # scholarcrawl
//!
//! Academic search crawler: query a scholarly search engine, fetch each
//! result's landing page, score it by keyword presence, filter by period,
//! domain and citation count, and write a ranked list of URLs.
//!
//! ## Modules
//!
//! - [`search`] - Search provider contract
//! - [`gscholar`] - Google Scholar provider
//! - [`openalex`] - OpenAlex provider
//! - [`fetcher`] - Landing page fetch and text extraction
//! - [`extract`] - Signal extractors
//! - [`pipeline`] - Filter pipeline
//! - [`rank`] - Score normalization and ranking
//! - [`output`] - Result file writer
//! - [`config`] - Run configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholarcrawl::{config::CrawlerConfig, fetcher::HttpPageFetcher, openalex::OpenAlex, pipeline::Pipeline};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CrawlerConfig::new("antimicrobial peptides", "peptide, molecular", 5, "out.txt")?;
//!     let fetcher = HttpPageFetcher::new(config.fetch);
//!     let pipeline = Pipeline::new(config, OpenAlex::new()?, fetcher)?;
//!
//!     let records = pipeline.crawl(pipeline.search().await?).await;
//!     let (records, _) = pipeline.filter(records)?;
//!     pipeline.write(&pipeline.rank(records))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod gscholar;
pub mod openalex;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod rank;
pub mod record;
pub mod search;

pub use error::{CrawlerError, Result};
