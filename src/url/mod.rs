//! URL handling module for Site-Mirror
//!
//! This module provides reference resolution and the resource classifier
//! that decides whether a discovered reference is downloaded, followed, or
//! ignored.

mod resolve;

use crate::config::DownloadConfig;

// Re-export main functions
pub use resolve::{extension_of, is_valid_url, parse_seed, resolve_reference, same_host};

/// Extensions downloaded as leaf resources when no include list is configured
pub const DEFAULT_RESOURCE_TYPES: &[&str] = &[
    ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".avif", ".bmp", ".woff",
    ".woff2", ".ttf", ".eot", ".otf", ".ico", ".mp4", ".webm", ".ogg", ".mp3", ".wav", ".pdf",
    ".json", ".xml", ".txt", ".zip",
];

/// Extensions of documents that are crawled as pages rather than downloaded
pub const PAGE_TYPES: &[&str] = &[
    ".html", ".htm", ".xhtml", ".shtml", ".php", ".asp", ".aspx", ".jsp",
];

/// What to do with a discovered reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Leaf resource - download as bytes
    Resource,
    /// Anchor to another page - crawl recursively
    PageLink,
    /// Neither downloaded nor followed
    Ignore,
}

/// Classifies a reference according to the download configuration
///
/// Rules are applied in the following order:
/// 1. Excluded extension (highest priority) → Ignore
/// 2. Allowed extension (`include_types`, or the built-in list) → Resource
/// 3. `download_all`: any non-anchor reference, or an anchor with a
///    non-page extension → Resource
/// 4. Anchor → PageLink
/// 5. Everything else → Ignore
///
/// # Arguments
///
/// * `tag` - Lower-case tag name the reference was found on
/// * `attribute_value` - Raw attribute value
/// * `extension` - Lower-case extension with leading dot, or empty
/// * `config` - The download configuration
///
/// # Examples
///
/// ```
/// use site_mirror::config::DownloadConfig;
/// use site_mirror::url::{classify, ReferenceKind};
///
/// let config = DownloadConfig::default();
/// assert_eq!(classify("img", "a.png", ".png", &config), ReferenceKind::Resource);
/// assert_eq!(classify("a", "/about", "", &config), ReferenceKind::PageLink);
/// assert_eq!(classify("img", "pixel.cgi", ".cgi", &config), ReferenceKind::Ignore);
/// ```
pub fn classify(
    tag: &str,
    attribute_value: &str,
    extension: &str,
    config: &DownloadConfig,
) -> ReferenceKind {
    if attribute_value.trim().is_empty() {
        return ReferenceKind::Ignore;
    }

    // Priority 1: exclusions win over everything
    if !extension.is_empty() && config.exclude_types.iter().any(|e| e == extension) {
        return ReferenceKind::Ignore;
    }

    // Priority 2: allowlist
    if !extension.is_empty() && is_allowed_type(extension, config) {
        return ReferenceKind::Resource;
    }

    let is_anchor = tag.eq_ignore_ascii_case("a");

    // Priority 3: download-all override
    if config.download_all {
        if !is_anchor {
            return ReferenceKind::Resource;
        }
        if !extension.is_empty() && !PAGE_TYPES.contains(&extension) {
            return ReferenceKind::Resource;
        }
    }

    // Priority 4: anchors are page links
    if is_anchor {
        return ReferenceKind::PageLink;
    }

    ReferenceKind::Ignore
}

fn is_allowed_type(extension: &str, config: &DownloadConfig) -> bool {
    if config.include_types.is_empty() {
        DEFAULT_RESOURCE_TYPES.contains(&extension)
    } else {
        config.include_types.iter().any(|e| e == extension)
    }
}
