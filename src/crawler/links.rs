//! Rewriting of anchors between saved pages
//!
//! Page links are only known to be local once the crawl has finished, so
//! this pass runs after the frontier is exhausted. Each saved page is read
//! back, anchors pointing at another saved page get a relative link (keeping
//! any fragment), and the page is written again only if something changed.

use crate::crawler::parser::rel_has_nofollow;
use crate::crawler::rewriter::{rewrite_error, rewriter_encoding};
use crate::storage::{relative_link, write_file};
use crate::url::resolve_reference;
use crate::MirrorError;
use encoding_rs::Encoding;
use lol_html::{element, HtmlRewriter, Settings};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// A page written to disk during the crawl
#[derive(Debug, Clone)]
pub struct SavedPage {
    /// URL the page was requested as
    pub url: Url,
    /// URL after redirects; relative anchors resolve against it
    pub base_url: Url,
    /// Local file the page was written to
    pub path: PathBuf,
    /// Character encoding the page was served in
    pub encoding: &'static Encoding,
}

/// Rewrites anchors between saved pages
///
/// Pages that fail to read, rewrite or write are logged and skipped; the
/// rest of the pass continues.
///
/// # Returns
///
/// Total number of anchors rewritten across all pages
pub async fn rewrite_page_links(pages: &[SavedPage]) -> usize {
    let mut index: HashMap<String, PathBuf> = HashMap::new();
    for page in pages {
        index.insert(page.url.to_string(), page.path.clone());
        index.insert(page.base_url.to_string(), page.path.clone());
    }

    let mut total = 0;
    for page in pages {
        match rewrite_one(page, &index).await {
            Ok(0) => {}
            Ok(count) => {
                tracing::debug!("Rewrote {} page links in {}", count, page.path.display());
                total += count;
            }
            Err(e) => tracing::warn!("Could not rewrite page links in {}: {}", page.url, e),
        }
    }

    total
}

async fn rewrite_one(page: &SavedPage, index: &HashMap<String, PathBuf>) -> Result<usize, MirrorError> {
    let bytes = tokio::fs::read(&page.path)
        .await
        .map_err(|e| MirrorError::filesystem(&page.path, e))?;

    let (rewritten, count) = rewrite_anchors(&bytes, page, index)?;
    if count > 0 {
        write_file(&page.path, &rewritten).await?;
    }
    Ok(count)
}

/// Rewrites anchors in one page's markup
fn rewrite_anchors(
    html: &[u8],
    page: &SavedPage,
    index: &HashMap<String, PathBuf>,
) -> Result<(Vec<u8>, usize), MirrorError> {
    let rewrite_count = AtomicUsize::new(0);
    let count = &rewrite_count;

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("a[href]", move |el| {
                if el.get_attribute("rel").is_some_and(|rel| rel_has_nofollow(&rel)) {
                    return Ok(());
                }

                if let Some(href) = el.get_attribute("href") {
                    let href = html_escape::decode_html_entities(&href).into_owned();
                    if let Some(link) = local_link_for(&href, page, index) {
                        el.set_attribute("href", &link)?;
                        count.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Ok(())
            })],
            encoding: rewriter_encoding(page.encoding),
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html)
        .map_err(|e| rewrite_error(page.url.as_str(), e))?;
    rewriter
        .end()
        .map_err(|e| rewrite_error(page.url.as_str(), e))?;

    Ok((output, rewrite_count.load(Ordering::Relaxed)))
}

/// Returns the relative link replacing `href`, if it targets a saved page
fn local_link_for(href: &str, page: &SavedPage, index: &HashMap<String, PathBuf>) -> Option<String> {
    let target = resolve_reference(href, &page.base_url)?;
    let target_path = index.get(target.as_str())?;
    let mut link = relative_link(&page.path, target_path)?;

    if let Some(fragment) = fragment_of(href) {
        link.push('#');
        link.push_str(fragment);
    }
    Some(link)
}

fn fragment_of(href: &str) -> Option<&str> {
    href.split_once('#').map(|(_, fragment)| fragment)
}
