//! Crawler module for mirroring pages and their resources
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching behind the `Fetcher` capability
//! - HTML parsing and reference discovery
//! - Concurrent resource downloads with retries
//! - Attribute rewriting and page saving
//! - Overall crawl coordination

mod coordinator;
mod download;
mod fetcher;
mod links;
mod parser;
mod rewriter;
mod scheduler;

pub use coordinator::Coordinator;
pub use download::{part_path, perform_download, RetryPolicy};
pub use fetcher::{build_http_client, ChunkStream, FetchedPage, Fetcher, HttpFetcher, ResourceStream};
pub use links::{rewrite_page_links, SavedPage};
pub use parser::{parse_page, rel_has_nofollow, ParsedPage, ResourceReference, REFERENCE_ATTRIBUTES};
pub use rewriter::{apply_rewrites, RewritePlan};
pub use scheduler::{DownloadScheduler, DownloadTicket};

use crate::config::Config;
use crate::output::CrawlReport;
use crate::MirrorError;
use std::path::PathBuf;

/// Runs a complete mirror operation
///
/// This is the main entry point for mirroring a site. It will:
/// 1. Validate the seed URL and configuration
/// 2. Build the HTTP client
/// 3. Crawl pages breadth-first up to `max_depth`
/// 4. Download resources and rewrite references to local paths
/// 5. Return the run report
///
/// # Arguments
///
/// * `seed_url` - The first page to mirror
/// * `max_depth` - Maximum link depth; the seed has depth 0
/// * `save_root` - Directory the mirror is written to
/// * `config` - The remaining mirror configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished (individual failures are in the report)
/// * `Err(MirrorError)` - Invalid seed URL or configuration
pub async fn crawl(
    seed_url: &str,
    max_depth: u32,
    save_root: impl Into<PathBuf>,
    mut config: Config,
) -> Result<CrawlReport, MirrorError> {
    config.crawler.max_depth = max_depth;
    config.output.directory = save_root.into();

    let coordinator = Coordinator::from_config(seed_url, config)?;
    Ok(coordinator.run().await)
}
