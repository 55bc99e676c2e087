//! HTML parser for discovering downloadable references
//!
//! This module parses a page once and extracts:
//! - Every reference attribute from the fixed tag/attribute map
//! - The page title
//!
//! Parsing is read-only. Rewriting happens in a separate pass over the raw
//! markup so the saved page keeps its original formatting.

use crate::url::resolve_reference;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Tags carrying references and the attribute holding the URL
pub const REFERENCE_ATTRIBUTES: &[(&str, &str)] = &[
    ("img", "src"),
    ("script", "src"),
    ("link", "href"),
    ("a", "href"),
    ("video", "src"),
    ("audio", "src"),
    ("source", "src"),
];

/// A reference discovered on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// Lower-case tag name
    pub tag_name: String,
    /// Attribute the URL was read from
    pub attribute_name: String,
    /// Attribute value as written in the document
    pub original_value: String,
    /// Absolute URL without fragment
    pub resolved_url: Url,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// References in discovery order
    pub references: Vec<ResourceReference>,
}

/// Parses HTML content and extracts references and the title
///
/// # Extraction Rules
///
/// **Include:**
/// - `img[src]`, `script[src]`, `link[href]`, `a[href]`,
///   `video[src]`, `audio[src]`, `source[src]`
///
/// **Exclude:**
/// - Elements whose `rel` contains `nofollow`
/// - `javascript:`, `mailto:`, `tel:` and `data:` values
/// - Fragment-only values and values that do not resolve to http(s)
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative references
///
/// # Example
///
/// ```
/// use site_mirror::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><img src="a.png"></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.references[0].resolved_url.as_str(), "https://example.com/a.png");
/// ```
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        references: extract_references(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_references(document: &Html, base_url: &Url) -> Vec<ResourceReference> {
    let mut references = Vec::new();

    for (tag, attribute) in REFERENCE_ATTRIBUTES {
        let Ok(selector) = Selector::parse(&format!("{}[{}]", tag, attribute)) else {
            continue;
        };

        for element in document.select(&selector) {
            if is_nofollow(&element) {
                continue;
            }

            let Some(value) = element.value().attr(attribute) else {
                continue;
            };

            if let Some(resolved_url) = resolve_reference(value, base_url) {
                references.push(ResourceReference {
                    tag_name: tag.to_string(),
                    attribute_name: attribute.to_string(),
                    original_value: value.to_string(),
                    resolved_url,
                });
            }
        }
    }

    references
}

fn is_nofollow(element: &ElementRef<'_>) -> bool {
    element.value().attr("rel").is_some_and(rel_has_nofollow)
}

/// Returns true if a `rel` attribute value contains the `nofollow` token
pub fn rel_has_nofollow(rel: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| token.eq_ignore_ascii_case("nofollow"))
}
