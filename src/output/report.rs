//! Run report for a completed crawl
//!
//! This module provides the counters collected while a crawl runs and the
//! formatted summary printed when it ends.

use crate::state::{DownloadOutcome, PageOutcome, SkipReason};
use std::time::Duration;

/// What kind of item a failure relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Page,
    Resource,
}

/// One failed page or resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub url: String,
    pub message: String,
}

/// Crawl report summary
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Pages written to disk
    pub pages_saved: u64,

    /// Pages that could not be fetched or written
    pub pages_failed: u64,

    /// Resources written (including resumed ones)
    pub resources_downloaded: u64,

    /// Resources kept because the file already existed
    pub resources_existing: u64,

    /// Resources skipped for exceeding the size ceiling
    pub resources_too_large: u64,

    /// Resources that failed after all retries
    pub resources_failed: u64,

    /// Bytes written by resource downloads
    pub bytes_downloaded: u64,

    /// Reference attributes rewritten to local paths
    pub references_rewritten: u64,

    /// Anchors between saved pages rewritten after the crawl
    pub page_links_rewritten: u64,

    /// Page links dropped because they were beyond the maximum depth
    pub links_beyond_depth: u64,

    /// Page links dropped because they left the seed host
    pub external_links_skipped: u64,

    /// Every failure, in the order it happened
    pub failures: Vec<FailureRecord>,

    /// Wall-clock time of the crawl
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one page
    pub fn record_page(&mut self, url: &str, outcome: PageOutcome, message: Option<String>) {
        if outcome.is_success() {
            self.pages_saved += 1;
            return;
        }

        self.pages_failed += 1;
        self.failures.push(FailureRecord {
            kind: FailureKind::Page,
            url: url.to_string(),
            message: message.unwrap_or_else(|| format!("{:?}", outcome)),
        });
    }

    /// Records the outcome of one resource download
    pub fn record_download(&mut self, url: &str, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { bytes, .. } => {
                self.resources_downloaded += 1;
                self.bytes_downloaded += bytes;
            }
            DownloadOutcome::Skipped(SkipReason::AlreadyExists) => self.resources_existing += 1,
            DownloadOutcome::Skipped(SkipReason::TooLarge) => self.resources_too_large += 1,
            DownloadOutcome::Failed { error, .. } => {
                self.resources_failed += 1;
                self.failures.push(FailureRecord {
                    kind: FailureKind::Resource,
                    url: url.to_string(),
                    message: error.to_string(),
                });
            }
        }
    }

    /// Total resources that were not written during this run
    pub fn resources_skipped(&self) -> u64 {
        self.resources_existing + self.resources_too_large
    }

    /// Returns true if nothing failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Prints the report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &CrawlReport) {
    println!("=== Mirror Report ===\n");

    println!("Pages:");
    println!("  Saved: {}", report.pages_saved);
    println!("  Failed: {}", report.pages_failed);
    println!("  Links beyond max depth: {}", report.links_beyond_depth);
    if report.external_links_skipped > 0 {
        println!("  External links skipped: {}", report.external_links_skipped);
    }
    println!();

    println!("Resources:");
    println!(
        "  Downloaded: {} ({})",
        report.resources_downloaded,
        format_bytes(report.bytes_downloaded)
    );
    println!("  Already present: {}", report.resources_existing);
    println!("  Over size limit: {}", report.resources_too_large);
    println!("  Failed: {}", report.resources_failed);
    println!();

    println!("Rewriting:");
    println!("  References rewritten: {}", report.references_rewritten);
    println!("  Page links rewritten: {}", report.page_links_rewritten);
    println!();

    if !report.failures.is_empty() {
        println!("Failures ({}):", report.failures.len());
        for failure in &report.failures {
            let kind = match failure.kind {
                FailureKind::Page => "page",
                FailureKind::Resource => "resource",
            };
            println!("  - [{}] {}: {}", kind, failure.url, failure.message);
        }
        println!();
    }

    println!("Finished in {:.1}s", report.elapsed.as_secs_f64());
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
