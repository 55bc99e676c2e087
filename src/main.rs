//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror offline website
//! mirror.

use clap::Parser;
use site_mirror::config::{
    load_config, normalize, parse_extension_list, validate, Config, OverwritePolicy,
};
use site_mirror::crawler::crawl;
use site_mirror::output::print_report;
use site_mirror::url::parse_seed;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site-Mirror: copy a website for offline browsing
///
/// Site-Mirror crawls a site breadth-first, downloads images, scripts,
/// stylesheets and media with a pool of workers, and rewrites every
/// reference it saved so the copy works from the local disk.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror a website for offline browsing", long_about = None)]
struct Cli {
    /// URL of the first page to mirror
    #[arg(value_name = "URL")]
    url: String,

    /// Directory the mirror is written to
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to TOML configuration file (flags override its values)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds to wait between page requests
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Maximum link depth to follow (the seed page is depth 0)
    #[arg(long, value_name = "N")]
    depth: Option<u32>,

    /// Only mirror the seed page and its resources
    #[arg(long, conflicts_with = "depth")]
    no_recursion: bool,

    /// User-Agent header sent with every request
    #[arg(long, value_name = "STRING")]
    user_agent: Option<String>,

    /// Pick a browser User-Agent at random for this run
    #[arg(long, conflicts_with = "user_agent")]
    random_user_agent: bool,

    /// Number of concurrent download workers
    #[arg(short, long, visible_alias = "threads", value_name = "N")]
    workers: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Retries for failed resource downloads
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Seconds to wait between download retries
    #[arg(long, value_name = "SECONDS")]
    retry_delay: Option<f64>,

    /// Replace resources that already exist locally
    #[arg(long, conflicts_with = "resume")]
    overwrite: bool,

    /// Continue partially downloaded resources with range requests
    #[arg(long, conflicts_with = "overwrite")]
    resume: bool,

    /// Comma-separated extensions to download (replaces the built-in list)
    #[arg(long, value_name = "LIST")]
    include_types: Option<String>,

    /// Comma-separated extensions never to download
    #[arg(long, value_name = "LIST")]
    exclude_types: Option<String>,

    /// Skip resources larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    max_file_size: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    no_verify_ssl: bool,

    /// Download every referenced file, not just known resource types
    #[arg(long)]
    all: bool,

    /// Extra request header, "Name: Value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Cookie header value sent with every request
    #[arg(long, value_name = "COOKIES")]
    cookies: Option<String>,

    /// Proxy URL for all requests
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Also crawl pages on other hosts
    #[arg(long)]
    follow_external: bool,

    /// Leave links between saved pages pointing at the live site
    #[arg(long)]
    no_rewrite_links: bool,

    /// Print the effective configuration and exit without crawling
    #[arg(long)]
    dry_run: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    // Reject a bad seed before doing any work
    let seed = match parse_seed(&cli.url) {
        Ok(url) => url,
        Err(reason) => {
            tracing::error!("Invalid URL '{}': {}", cli.url, reason);
            return Err(format!("invalid URL '{}': {}", cli.url, reason).into());
        }
    };

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e);
        }
    };

    if cli.dry_run {
        print_config(seed.as_str(), &config);
        return Ok(());
    }

    let max_depth = config.crawler.max_depth;
    let save_root = config.output.directory.clone();

    match crawl(seed.as_str(), max_depth, save_root, config).await {
        Ok(report) => {
            if !cli.quiet {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.init(),
    }

    Ok(())
}

/// Loads the optional config file and applies command-line overrides
fn build_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };

    if let Some(dir) = &cli.output {
        config.output.directory = dir.clone();
    }
    if let Some(delay) = cli.delay {
        config.crawler.delay_ms = seconds_to_millis("--delay", delay)?;
    }
    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }
    if cli.no_recursion {
        config.crawler.max_depth = 0;
    }
    if cli.follow_external {
        config.crawler.follow_external = true;
    }
    if cli.no_rewrite_links {
        config.crawler.rewrite_page_links = false;
    }

    if let Some(user_agent) = &cli.user_agent {
        config.http.user_agent = user_agent.clone();
    }
    if cli.random_user_agent {
        config.http.random_user_agent = true;
    }
    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }
    if cli.no_verify_ssl {
        config.http.tls_verify = false;
    }
    for header in &cli.headers {
        let (name, value) = parse_header(header)?;
        config.http.headers.insert(name, value);
    }
    if let Some(cookies) = &cli.cookies {
        config.http.cookies = Some(cookies.clone());
    }
    if let Some(proxy) = &cli.proxy {
        config.http.proxy = Some(proxy.clone());
    }

    if let Some(workers) = cli.workers {
        config.download.workers = workers;
    }
    if let Some(retries) = cli.retries {
        config.download.retries = retries;
    }
    if let Some(delay) = cli.retry_delay {
        config.download.retry_delay_ms = seconds_to_millis("--retry-delay", delay)?;
    }
    if cli.overwrite {
        config.download.overwrite = OverwritePolicy::Overwrite;
    }
    if cli.resume {
        config.download.overwrite = OverwritePolicy::Resume;
    }
    if let Some(list) = &cli.include_types {
        config.download.include_types = parse_extension_list(list);
    }
    if let Some(list) = &cli.exclude_types {
        config.download.exclude_types = parse_extension_list(list);
    }
    if let Some(size) = cli.max_file_size {
        config.download.max_file_size = Some(size);
    }
    if cli.all {
        config.download.download_all = true;
    }

    normalize(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Splits a `Name: Value` header argument
fn parse_header(header: &str) -> Result<(String, String), String> {
    match header.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("header '{}' must look like 'Name: Value'", header)),
    }
}

fn seconds_to_millis(flag: &str, seconds: f64) -> Result<u64, String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("{} must be a non-negative number of seconds", flag));
    }
    Ok((seconds * 1000.0).round() as u64)
}

/// Handles the --dry-run mode: shows what would be mirrored
fn print_config(seed: &str, config: &Config) {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Seed: {}", seed);
    println!("Output directory: {}", config.output.directory.display());

    println!("\nCrawler:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Delay between pages: {}ms", config.crawler.delay_ms);
    println!("  Follow external links: {}", config.crawler.follow_external);
    println!("  Rewrite page links: {}", config.crawler.rewrite_page_links);

    println!("\nHTTP:");
    if config.http.random_user_agent {
        println!("  User agent: random");
    } else {
        println!("  User agent: {}", config.http.user_agent);
    }
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Verify TLS: {}", config.http.tls_verify);
    for name in config.http.headers.keys() {
        println!("  Header: {}", name);
    }
    if config.http.cookies.is_some() {
        println!("  Cookies: set");
    }
    if let Some(proxy) = &config.http.proxy {
        println!("  Proxy: {}", proxy);
    }

    println!("\nDownloads:");
    println!("  Workers: {}", config.download.workers);
    println!(
        "  Retries: {} ({}ms apart)",
        config.download.retries, config.download.retry_delay_ms
    );
    println!("  Existing files: {}", config.download.overwrite);
    match config.download.max_file_size {
        Some(size) => println!("  Max file size: {} bytes", size),
        None => println!("  Max file size: unlimited"),
    }
    println!("  Download all: {}", config.download.download_all);
    if !config.download.include_types.is_empty() {
        println!("  Include: {}", config.download.include_types.join(" "));
    }
    if !config.download.exclude_types.is_empty() {
        println!("  Exclude: {}", config.download.exclude_types.join(" "));
    }

    println!("\n✓ Configuration is valid");
}
