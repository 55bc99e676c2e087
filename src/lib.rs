//! Site-Mirror: an offline website mirror
//!
//! This crate implements a crawler that copies a website to local storage,
//! downloading embedded resources concurrently and rewriting page references
//! so the saved copy can be browsed offline.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Site-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL '{url}': {reason}")]
    InvalidInput { url: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTML rewrite error for {url}: {message}")]
    HtmlRewrite { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Download queue is closed")]
    QueueClosed,
}

impl MirrorError {
    /// Wraps an I/O error with the path it happened on
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Transport-level failures reported by a fetcher
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Returns true when retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::Body { .. } => true,
            Self::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Site-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator};
pub use output::CrawlReport;
pub use crate::url::{classify, resolve_reference, ReferenceKind};
