//! State module for tracking crawl progress
//!
//! This module provides the per-run state shared between the coordinator and
//! the download workers.
//!
//! # Components
//!
//! - `VisitedSet`: URLs already crawled or queued during this run
//! - `CrawlJob` / `DownloadJob`: units of work for pages and resources
//! - `DownloadOutcome` / `PageOutcome`: what happened to each unit

mod jobs;
mod outcome;
mod visited;

// Re-export main types
pub use jobs::{CrawlJob, DownloadJob};
pub use outcome::{DownloadOutcome, PageOutcome, SkipReason};
pub use visited::VisitedSet;
