use url::Url;

/// Resolves an attribute value to an absolute, fetchable URL
///
/// Returns None if the reference should be skipped:
/// - empty values
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only references (same page anchors)
/// - values that do not resolve to an http(s) URL with a host
///
/// The fragment of the resolved URL is removed so that `page#a` and
/// `page#b` are treated as the same page.
///
/// # Examples
///
/// ```
/// use site_mirror::url::resolve_reference;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/intro").unwrap();
/// let resolved = resolve_reference("../img/logo.png#top", &base).unwrap();
/// assert_eq!(resolved.as_str(), "https://example.com/img/logo.png");
/// ```
pub fn resolve_reference(value: &str, base_url: &Url) -> Option<Url> {
    let value = value.trim();

    if value.is_empty() || value.starts_with('#') {
        return None;
    }

    let lower = value.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut resolved = base_url.join(value).ok()?;
    if !is_valid_url(&resolved) {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved)
}

/// Checks that a URL has an http(s) scheme and a host
pub fn is_valid_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}

/// Parses and validates the seed URL of a crawl
pub fn parse_seed(input: &str) -> Result<Url, String> {
    let mut url = Url::parse(input.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    url.set_fragment(None);
    Ok(url)
}

/// Returns true if both URLs point at the same host and port
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str().map(|h| h.to_ascii_lowercase()) == b.host_str().map(|h| h.to_ascii_lowercase())
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Returns the lower-cased extension (with leading dot) of a URL's last
/// path segment, or an empty string when it has none
pub fn extension_of(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < last.len() => last[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}
