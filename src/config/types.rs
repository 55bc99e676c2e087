use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Site-Mirror
///
/// Built once at startup and shared read-only by the fetcher, the
/// coordinator and the download workers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub download: DownloadConfig,
    pub output: OutputConfig,
}

/// Traversal behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of page-link hops from the seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Pause after each saved page (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Follow anchors that leave the seed host
    #[serde(rename = "follow-external")]
    pub follow_external: bool,

    /// Rewrite anchors between saved pages once the crawl has drained
    #[serde(rename = "rewrite-page-links")]
    pub rewrite_page_links: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            delay_ms: 1000,
            follow_external: false,
            rewrite_page_links: true,
        }
    }
}

impl CrawlerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Pick the User-Agent from `USER_AGENTS` when the client is built
    #[serde(rename = "random-user-agent")]
    pub random_user_agent: bool,

    /// Timeout applied to every network operation (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Verify TLS certificates
    #[serde(rename = "tls-verify")]
    pub tls_verify: bool,

    /// Extra headers added to every request
    pub headers: BTreeMap<String, String>,

    /// Raw `Cookie` header value
    pub cookies: Option<String>,

    /// Proxy URL for all requests
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            random_user_agent: false,
            timeout_secs: 10,
            tls_verify: true,
            headers: BTreeMap::new(),
            cookies: None,
            proxy: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Browser User-Agent strings used by `random-user-agent`
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:91.0) Gecko/20100101 Firefox/91.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.159 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15",
];

/// Resource download configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Number of concurrent download workers
    pub workers: usize,

    /// Retries after the first failed attempt
    pub retries: u32,

    /// Pause between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// What to do when the target file already exists
    pub overwrite: OverwritePolicy,

    /// Largest resource to keep, in bytes
    #[serde(rename = "max-file-size")]
    pub max_file_size: Option<u64>,

    /// Treat every reference with a file extension as a resource
    #[serde(rename = "download-all")]
    pub download_all: bool,

    /// Replaces the built-in resource extension list when non-empty
    #[serde(rename = "include-types")]
    pub include_types: Vec<String>,

    /// Extensions that are never downloaded or followed
    #[serde(rename = "exclude-types")]
    pub exclude_types: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            retries: 3,
            retry_delay_ms: 5000,
            overwrite: OverwritePolicy::Skip,
            max_file_size: None,
            download_all: false,
            include_types: Vec::new(),
            exclude_types: Vec::new(),
        }
    }
}

impl DownloadConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory of the mirror
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("downloaded_site"),
        }
    }
}

/// Policy for resources whose local file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Leave the existing file untouched
    #[default]
    Skip,
    /// Download again and replace the file
    Overwrite,
    /// Continue a partial file with a range request
    Resume,
}

impl FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "resume" => Ok(Self::Resume),
            other => Err(format!(
                "unknown overwrite mode '{}' (expected skip, overwrite or resume)",
                other
            )),
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::Resume => "resume",
        };
        f.write_str(s)
    }
}
