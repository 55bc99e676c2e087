//! Configuration module for Site-Mirror
//!
//! This module handles loading, parsing, and validating the mirror
//! configuration. Values come from an optional TOML file and are then
//! overridden by command-line flags.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirror will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DownloadConfig, HttpConfig, OutputConfig, OverwritePolicy,
    DEFAULT_USER_AGENT, USER_AGENTS,
};

// Re-export parser functions
pub use parser::{load_config, normalize, parse_extension_list};
pub use validation::validate;
