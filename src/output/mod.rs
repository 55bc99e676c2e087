//! Output module for crawl reporting
//!
//! This module handles:
//! - Collecting page and resource counters during a crawl
//! - Printing the end-of-run summary

mod report;

pub use report::{print_report, CrawlReport, FailureKind, FailureRecord};
