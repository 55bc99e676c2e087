//! Streaming HTML rewriting for saved pages
//!
//! Rewrites are planned while a page's downloads complete, then applied in a
//! single lol_html pass over the original bytes, decoded with the page's own
//! character encoding. Only attributes whose resource is available locally
//! appear in a plan; everything else passes through byte-for-byte.

use crate::crawler::parser::{rel_has_nofollow, ResourceReference, REFERENCE_ATTRIBUTES};
use crate::MirrorError;
use encoding_rs::Encoding;
use lol_html::{element, AsciiCompatibleEncoding, HtmlRewriter, Settings};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

type RewriteKey = (String, String, String);

/// Replacement values for one page, keyed by (tag, attribute, original value)
///
/// Keying by value rather than element identity means every occurrence of
/// the same reference on a page receives the same local link.
#[derive(Debug, Clone, Default)]
pub struct RewritePlan {
    replacements: HashMap<RewriteKey, String>,
}

impl RewritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `reference` to be replaced by `new_value`
    pub fn insert(&mut self, reference: &ResourceReference, new_value: impl Into<String>) {
        self.replacements.insert(
            (
                reference.tag_name.clone(),
                reference.attribute_name.clone(),
                reference.original_value.clone(),
            ),
            new_value.into(),
        );
    }

    /// Looks up the replacement for an attribute value
    pub fn lookup(&self, tag: &str, attribute: &str, value: &str) -> Option<&str> {
        self.replacements
            .get(&(tag.to_string(), attribute.to_string(), value.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    fn targets(&self, tag: &str, attribute: &str) -> bool {
        self.replacements
            .keys()
            .any(|(t, a, _)| t == tag && a == attribute)
    }
}

/// Applies a rewrite plan to a page
///
/// Elements with `rel="nofollow"` are never touched, matching discovery.
///
/// # Arguments
///
/// * `html` - The page as served
/// * `encoding` - Character encoding of `html`
/// * `plan` - Replacements for available resources
/// * `page_url` - URL of the page, used in error reports
///
/// # Returns
///
/// * `Ok((Vec<u8>, usize))` - Rewritten page and number of attributes changed
/// * `Err(MirrorError)` - The rewriter rejected the document
pub fn apply_rewrites(
    html: &[u8],
    encoding: &'static Encoding,
    plan: &RewritePlan,
    page_url: &str,
) -> Result<(Vec<u8>, usize), MirrorError> {
    if plan.is_empty() {
        return Ok((html.to_vec(), 0));
    }

    let rewrite_count = AtomicUsize::new(0);
    let mut handlers = Vec::new();

    for (tag, attribute) in REFERENCE_ATTRIBUTES {
        if !plan.targets(tag, attribute) {
            continue;
        }

        let count = &rewrite_count;
        handlers.push(element!(format!("{}[{}]", tag, attribute), move |el| {
            if el.get_attribute("rel").is_some_and(|rel| rel_has_nofollow(&rel)) {
                return Ok(());
            }

            if let Some(value) = el.get_attribute(attribute) {
                let replacement = plan.lookup(tag, attribute, &value).or_else(|| {
                    let decoded = html_escape::decode_html_entities(&value);
                    plan.lookup(tag, attribute, &decoded)
                });

                if let Some(replacement) = replacement {
                    el.set_attribute(attribute, replacement)?;
                    count.fetch_add(1, Ordering::Relaxed);
                }
            }
            Ok(())
        }));
    }

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: handlers,
            encoding: rewriter_encoding(encoding),
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html)
        .map_err(|e| rewrite_error(page_url, e))?;
    rewriter.end().map_err(|e| rewrite_error(page_url, e))?;

    Ok((output, rewrite_count.load(Ordering::Relaxed)))
}

pub(crate) fn rewriter_encoding(encoding: &'static Encoding) -> AsciiCompatibleEncoding {
    AsciiCompatibleEncoding::new(encoding).unwrap_or_else(AsciiCompatibleEncoding::utf_8)
}

pub(crate) fn rewrite_error(page_url: &str, error: impl std::fmt::Display) -> MirrorError {
    MirrorError::HtmlRewrite {
        url: page_url.to_string(),
        message: error.to_string(),
    }
}
