//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror, including:
//! - The `Fetcher` capability used by the coordinator and the workers
//! - Building HTTP clients from the immutable HTTP configuration
//! - Whole-page GET requests with a request timeout
//! - Streaming GET requests with a per-chunk read timeout
//! - Error classification

use crate::config::{HttpConfig, USER_AGENTS};
use crate::{ConfigError, FetchError, MirrorError};
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use futures::stream::{self, BoxStream, StreamExt};
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, RANGE};
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use url::Url;

/// A fetched page body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Returns true unless the server declared a non-HTML content type
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
            None => true,
        }
    }

    /// Character encoding of the body
    ///
    /// Taken from the Content-Type charset, then from a `<meta>` charset
    /// declaration near the top of the document, falling back to UTF-8.
    /// Encodings that are not ASCII-compatible are treated as UTF-8.
    pub fn encoding(&self) -> &'static Encoding {
        let declared = self
            .content_type
            .as_deref()
            .and_then(charset_from_content_type)
            .or_else(|| sniff_meta_charset(&self.body));

        match declared {
            Some(encoding) if encoding.is_ascii_compatible() => encoding,
            _ => UTF_8,
        }
    }
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let label = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
        Encoding::for_label(label.as_bytes())
    })
}

fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    if !head.contains("<meta") {
        return None;
    }

    let start = head.find("charset=")? + "charset=".len();
    let label: String = head[start..]
        .trim_start_matches(|c: char| c == '"' || c == '\'')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(*c, '-' | '_' | ':' | '.'))
        .collect();
    Encoding::for_label(label.as_bytes())
}

/// How far into a page to look for a `<meta>` charset declaration
const META_SNIFF_BYTES: usize = 1024;

/// Stream of body chunks
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, FetchError>>;

/// A response whose body is consumed incrementally
pub struct ResourceStream {
    /// HTTP status code (200, 206, or 416 for an exhausted range)
    pub status: u16,
    /// Content-Length of this response, if the server sent one
    pub content_length: Option<u64>,
    /// Body chunks
    pub body: ChunkStream,
}

impl ResourceStream {
    /// Returns true if the server honored a range request
    pub fn is_partial(&self) -> bool {
        self.status == StatusCode::PARTIAL_CONTENT.as_u16()
    }

    /// Returns true if the requested range starts at or after the end of
    /// the resource
    pub fn is_range_exhausted(&self) -> bool {
        self.status == StatusCode::RANGE_NOT_SATISFIABLE.as_u16()
    }
}

impl std::fmt::Debug for ResourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStream")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Capability for fetching remote content
///
/// Headers, timeouts and the TLS policy are fixed when the implementation
/// is constructed, so every call site shares the same request settings.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a whole page; non-2xx statuses are errors
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// Opens a streaming download, optionally starting at a byte offset
    ///
    /// When `range_start` is set, a `416` response is returned as a stream
    /// with no body instead of an error.
    async fn get_stream(
        &self,
        url: &Url,
        range_start: Option<u64>,
    ) -> Result<ResourceStream, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(MirrorError)` - Invalid header/proxy settings or client failure
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::HttpConfig;
/// use site_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, MirrorError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::Validation(format!("Invalid header name '{}'", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::Validation(format!("Invalid value for header '{}'", name)))?;
        headers.insert(name, value);
    }

    if let Some(cookies) = &config.cookies {
        let value = HeaderValue::from_str(cookies)
            .map_err(|_| ConfigError::Validation("Invalid cookie string".to_string()))?;
        headers.insert(COOKIE, value);
    }

    let mut builder = Client::builder()
        .user_agent(choose_user_agent(config))
        .default_headers(headers)
        .connect_timeout(config.timeout())
        .danger_accept_invalid_certs(!config.tls_verify)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    Ok(builder.build()?)
}

/// Production fetcher backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, MirrorError> {
        Ok(Self {
            client: build_http_client(config)?,
            timeout: config.timeout(),
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_error(url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url.as_str(), &e))?;

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }

    async fn get_stream(
        &self,
        url: &Url,
        range_start: Option<u64>,
    ) -> Result<ResourceStream, FetchError> {
        let mut request = self.client.get(url.as_str());
        if let Some(start) = range_start {
            request = request.header(RANGE, format!("bytes={}-", start));
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| classify_error(url.as_str(), &e))?;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE && range_start.is_some() {
            return Ok(ResourceStream {
                status: status.as_u16(),
                content_length: Some(0),
                body: stream::empty().boxed(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Content-Length from the header; compressed bodies report none
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        Ok(ResourceStream {
            status: status.as_u16(),
            content_length,
            body: chunk_stream(response, url.to_string(), self.timeout),
        })
    }
}

/// Returns the User-Agent a client built from `config` sends
fn choose_user_agent(config: &HttpConfig) -> String {
    if config.random_user_agent {
        if let Some(agent) = USER_AGENTS.choose(&mut rand::rng()) {
            tracing::debug!("Using random User-Agent: {}", agent);
            return agent.to_string();
        }
    }
    config.user_agent.clone()
}

/// Turns a response body into chunks, failing any read that stalls longer
/// than `read_timeout`
fn chunk_stream(response: reqwest::Response, url: String, read_timeout: Duration) -> ChunkStream {
    let inner = response.bytes_stream().boxed();

    stream::unfold(Some((inner, url)), move |state| async move {
        let (mut inner, url) = state?;
        match tokio::time::timeout(read_timeout, inner.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk.to_vec()), Some((inner, url)))),
            Ok(Some(Err(e))) => Some((Err(classify_error(&url, &e)), None)),
            Ok(None) => None,
            Err(_) => Some((Err(FetchError::Timeout { url }), None)),
        }
    })
    .boxed()
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: format!("Connection failed: {}", error),
        }
    } else if error.is_body() || error.is_decode() {
        FetchError::Body {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
