use crate::config::OverwritePolicy;
use std::path::PathBuf;
use url::Url;

/// A page awaiting fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub url: Url,
    pub depth: u32,
}

impl CrawlJob {
    /// The job for the seed URL
    pub fn seed(url: Url) -> Self {
        Self { url, depth: 0 }
    }

    /// A job for a link found on this page, one hop deeper
    pub fn child(&self, url: Url) -> Self {
        Self {
            url,
            depth: self.depth + 1,
        }
    }
}

/// An immutable unit of download work handed to one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub remote_url: Url,
    pub local_path: PathBuf,
    pub size_limit: Option<u64>,
    pub overwrite_policy: OverwritePolicy,
}
