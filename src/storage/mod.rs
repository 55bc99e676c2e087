//! Storage module for the local mirror layout
//!
//! This module handles where and how mirrored files land on disk:
//! - Mapping remote URLs to sanitized local paths
//! - Disambiguating paths claimed by more than one URL
//! - Computing relative links between saved files
//! - Writing files with their parent directories

mod mapper;
mod registry;

pub use mapper::{disambiguate, map_url_to_path, sanitize_segment, INDEX_FILE};
pub use registry::PathRegistry;

use crate::MirrorError;
use std::path::{Component, Path};

/// Computes the link from a saved page to another saved file
///
/// The result is relative to the directory containing `from_page`, uses `/`
/// separators on every platform, and percent-encodes each component so it
/// can be placed in an HTML attribute.
///
/// # Arguments
///
/// * `from_page` - Local path of the page that will contain the link
/// * `to_file` - Local path of the link target
///
/// # Returns
///
/// * `Some(String)` - The relative link
/// * `None` - No relative path exists between the two locations
///
/// # Example
///
/// ```
/// use site_mirror::storage::relative_link;
/// use std::path::Path;
///
/// let link = relative_link(
///     Path::new("/mirror/docs/guide/index.html"),
///     Path::new("/mirror/img/logo.png"),
/// );
/// assert_eq!(link.as_deref(), Some("../../img/logo.png"));
/// ```
pub fn relative_link(from_page: &Path, to_file: &Path) -> Option<String> {
    let from_dir = from_page.parent()?;
    let relative = pathdiff::diff_paths(to_file, from_dir)?;

    let parts: Vec<String> = relative
        .components()
        .map(|component| match component {
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir => Some(".".to_string()),
            Component::Normal(part) => {
                Some(urlencoding::encode(&part.to_string_lossy()).into_owned())
            }
            Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.is_empty() {
        return None;
    }

    Some(parts.join("/"))
}

/// Writes a file, creating its parent directories first
pub async fn write_file(path: &Path, contents: &[u8]) -> Result<(), MirrorError> {
    ensure_parent_dir(path).await?;
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| MirrorError::filesystem(path, e))
}

/// Creates the directory that will contain `path`
pub async fn ensure_parent_dir(path: &Path) -> Result<(), MirrorError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MirrorError::filesystem(parent, e))?;
    }
    Ok(())
}
