/// Outcome definitions for pages and resource downloads
use crate::MirrorError;
use std::fmt;

/// Why a download was not performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Target file exists and the policy is skip
    AlreadyExists,
    /// Resource is larger than the configured ceiling
    TooLarge,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => f.write_str("file already exists"),
            Self::TooLarge => f.write_str("exceeds size limit"),
        }
    }
}

/// Result of one download job as reported by a worker
#[derive(Debug)]
pub enum DownloadOutcome {
    /// File written (or completed, when resumed)
    Downloaded { bytes: u64, resumed: bool },

    /// Nothing was written
    Skipped(SkipReason),

    /// Gave up after the allowed attempts
    Failed { attempts: u32, error: MirrorError },
}

impl DownloadOutcome {
    /// Returns true if the resource is present at its local path afterwards
    ///
    /// An existing file kept under the skip policy counts as available, so
    /// references to it are still rewritten.
    pub fn is_available(&self) -> bool {
        matches!(
            self,
            Self::Downloaded { .. } | Self::Skipped(SkipReason::AlreadyExists)
        )
    }
}

/// What happened to one crawled page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Rewritten page written to disk
    Saved,
    /// Page could not be fetched; subtree truncated
    FetchFailed,
    /// Page fetched but could not be written
    WriteFailed,
}

impl PageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }
}
