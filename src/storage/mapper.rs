use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Characters replaced with `_` in every path segment
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// File name synthesized for directory-like URLs
pub const INDEX_FILE: &str = "index.html";

/// Maps a remote URL to its local path under `save_root`
///
/// # Mapping Rules
///
/// 1. Take the URL's path component (host, query and fragment are ignored)
/// 2. Percent-decode and sanitize every segment on its own, so separators
///    coming from the URL structure are preserved while an encoded `%2F`
///    inside a segment becomes `_`
/// 3. A path ending in `/` (or the empty path) gets `index.html`
/// 4. A path whose last segment has no extension gets `/index.html`
///
/// The function is pure: the same URL and root always produce the same path.
///
/// # Examples
///
/// ```
/// use site_mirror::storage::map_url_to_path;
/// use std::path::Path;
/// use url::Url;
///
/// let root = Path::new("/mirror");
/// let url = Url::parse("https://example.com/docs/guide").unwrap();
/// assert_eq!(
///     map_url_to_path(&url, root),
///     Path::new("/mirror/docs/guide/index.html")
/// );
/// ```
pub fn map_url_to_path(url: &Url, save_root: &Path) -> PathBuf {
    let raw_path = url.path();
    let directory_like = raw_path.ends_with('/');

    let mut segments: Vec<String> = raw_path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| sanitize_segment(&decode_segment(s)))
        .collect();

    let needs_index = directory_like
        || segments
            .last()
            .map_or(true, |last| Path::new(last).extension().is_none());

    if needs_index {
        segments.push(INDEX_FILE.to_string());
    }

    let mut path = save_root.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    path
}

/// Replaces characters that are invalid in file names on common filesystems
///
/// Dot-only segments are replaced as well so a mapped path can never climb
/// out of the save root.
pub fn sanitize_segment(segment: &str) -> String {
    if segment.is_empty() || segment == "." || segment == ".." {
        return "_".to_string();
    }

    segment
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Inserts a short hash of the URL before the file extension
///
/// Used when a different URL already claimed `path` during this run.
/// `logo.png` becomes `logo-1a2b3c4d.png`.
pub fn disambiguate(path: &Path, url: &Url) -> PathBuf {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let suffix = &hex::encode(digest)[..8];

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}-{}", stem, suffix),
    };

    path.with_file_name(file_name)
}

fn decode_segment(segment: &str) -> String {
    let bytes = urlencoding::decode_binary(segment.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}
