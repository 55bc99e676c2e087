//! Crawler coordinator - main mirror orchestration logic
//!
//! This module contains the breadth-first crawl loop, including:
//! - Managing the frontier queue and the visited set
//! - Fetching, parsing and classifying each page's references
//! - Handing resources to the download scheduler and awaiting their tickets
//! - Rewriting and saving pages
//! - Rewriting links between saved pages once the frontier is exhausted

use crate::config::{validate, Config};
use crate::crawler::download::RetryPolicy;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::links::{rewrite_page_links, SavedPage};
use crate::crawler::parser::{parse_page, ResourceReference};
use crate::crawler::rewriter::{apply_rewrites, RewritePlan};
use crate::crawler::scheduler::DownloadScheduler;
use crate::output::CrawlReport;
use crate::state::{CrawlJob, DownloadJob, DownloadOutcome, PageOutcome, VisitedSet};
use crate::storage::{relative_link, write_file, PathRegistry};
use crate::url::{classify, extension_of, parse_seed, same_host, ReferenceKind};
use crate::MirrorError;
use encoding_rs::Encoding;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    seed: Url,
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    visited: VisitedSet,
    registry: PathRegistry,
    /// Hosts page links may stay on when external links are not followed
    home_hosts: Vec<Url>,
    /// Resource URL → whether it is available locally
    resources: HashMap<String, bool>,
    saved_pages: Vec<SavedPage>,
    report: CrawlReport,
}

impl Coordinator {
    /// Creates a coordinator with an explicit fetcher
    ///
    /// # Arguments
    ///
    /// * `seed` - The first page to mirror
    /// * `config` - The mirror configuration
    /// * `fetcher` - Fetch capability used for pages and resources
    pub fn new(seed: Url, config: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        let registry = PathRegistry::new(config.output.directory.clone());

        Self {
            home_hosts: vec![seed.clone()],
            seed,
            config: Arc::new(config),
            fetcher,
            visited: VisitedSet::new(),
            registry,
            resources: HashMap::new(),
            saved_pages: Vec::new(),
            report: CrawlReport::new(),
        }
    }

    /// Creates a coordinator that fetches over HTTP
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(MirrorError)` - Invalid seed URL, invalid configuration, or the
    ///   HTTP client could not be built
    pub fn from_config(seed_url: &str, config: Config) -> Result<Self, MirrorError> {
        let seed = parse_seed(seed_url).map_err(|reason| MirrorError::InvalidInput {
            url: seed_url.to_string(),
            reason,
        })?;

        validate(&config)?;
        let fetcher = HttpFetcher::new(&config.http)?;

        Ok(Self::new(seed, config, Arc::new(fetcher)))
    }

    /// Runs the crawl until the frontier is exhausted
    ///
    /// This method:
    /// 1. Starts the download workers
    /// 2. Processes pages in breadth-first order
    /// 3. Drains the download queue and stops the workers
    /// 4. Rewrites links between saved pages
    ///
    /// Individual page and resource failures are recorded in the report and
    /// never stop the crawl.
    pub async fn run(mut self) -> CrawlReport {
        let start_time = Instant::now();
        let max_depth = self.config.crawler.max_depth;
        let delay = self.config.crawler.delay();

        tracing::info!(
            "Mirroring {} into {} (max depth {}, {} workers)",
            self.seed,
            self.registry.root().display(),
            max_depth,
            self.config.download.workers
        );

        let scheduler = DownloadScheduler::start(
            Arc::clone(&self.fetcher),
            RetryPolicy::new(self.config.download.retries, self.config.download.retry_delay()),
            self.config.download.workers,
        );

        let mut frontier = VecDeque::new();
        self.visited.insert_if_new(self.seed.as_str());
        frontier.push_back(CrawlJob::seed(self.seed.clone()));

        let mut pages_processed: u64 = 0;

        while let Some(job) = frontier.pop_front() {
            if job.depth > max_depth {
                tracing::debug!("Skipping {}: depth {} > {}", job.url, job.depth, max_depth);
                continue;
            }

            self.process_page(&job, &scheduler, &mut frontier).await;
            pages_processed += 1;

            // Progress reporting every 10 pages
            if pages_processed % 10 == 0 {
                let elapsed = start_time.elapsed();
                let rate = pages_processed as f64 / elapsed.as_secs_f64();
                tracing::info!(
                    "Progress: {} pages processed, {} in frontier, {} downloads pending, {:.2} pages/sec",
                    pages_processed,
                    frontier.len(),
                    scheduler.pending(),
                    rate
                );
            }

            if !delay.is_zero() && !frontier.is_empty() {
                tokio::time::sleep(delay).await;
            }
        }

        tracing::debug!("Frontier is empty, waiting for downloads to drain");
        scheduler.shutdown().await;

        if self.config.crawler.rewrite_page_links && !self.saved_pages.is_empty() {
            self.report.page_links_rewritten = rewrite_page_links(&self.saved_pages).await as u64;
        }

        self.report.elapsed = start_time.elapsed();
        tracing::info!(
            "Mirror completed: {} pages saved, {} resources downloaded in {:?}",
            self.report.pages_saved,
            self.report.resources_downloaded,
            self.report.elapsed
        );

        self.report
    }

    /// Processes a single page
    ///
    /// This method:
    /// 1. Fetches the page
    /// 2. Claims its local path
    /// 3. Parses and classifies its references
    /// 4. Downloads resources and queues page links
    /// 5. Rewrites and saves the page
    async fn process_page(
        &mut self,
        job: &CrawlJob,
        scheduler: &DownloadScheduler,
        frontier: &mut VecDeque<CrawlJob>,
    ) {
        let url = job.url.as_str();
        tracing::debug!("Fetching page {} (depth {})", url, job.depth);

        let page = match self.fetcher.get(&job.url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Failed to fetch page {}: {}", url, e);
                self.report
                    .record_page(url, PageOutcome::FetchFailed, Some(e.to_string()));
                return;
            }
        };

        if page.final_url != job.url {
            tracing::debug!("{} redirected to {}", url, page.final_url);
            self.visited.insert_if_new(page.final_url.as_str());
            if job.depth == 0 {
                self.home_hosts.push(page.final_url.clone());
            }
        }

        let page_path = self.registry.claim(&job.url);

        if !page.is_html() {
            tracing::info!(
                "{} is not HTML ({}), saving as-is",
                url,
                page.content_type.as_deref().unwrap_or("unknown type")
            );
            self.save_page(job, &page.final_url, &page_path, &page.body, None, None)
                .await;
            return;
        }

        let encoding = page.encoding();
        let (html, _, had_errors) = encoding.decode(&page.body);
        if had_errors {
            tracing::debug!("{} has bytes invalid in {}", url, encoding.name());
        }
        let parsed = parse_page(&html, &page.final_url);

        let mut resources = Vec::new();
        let mut page_links = Vec::new();
        for reference in parsed.references {
            let extension = extension_of(&reference.resolved_url);
            match classify(
                &reference.tag_name,
                &reference.original_value,
                &extension,
                &self.config.download,
            ) {
                ReferenceKind::Resource => resources.push(reference),
                ReferenceKind::PageLink => page_links.push(reference.resolved_url),
                ReferenceKind::Ignore => tracing::trace!(
                    "Ignoring <{} {}=\"{}\">",
                    reference.tag_name,
                    reference.attribute_name,
                    reference.original_value
                ),
            }
        }

        let plan = self
            .download_resources(&page_path, &resources, scheduler)
            .await;

        for link in page_links {
            self.enqueue_page_link(job, link, frontier);
        }

        let output = match apply_rewrites(&page.body, encoding, &plan, url) {
            Ok((output, count)) => {
                self.report.references_rewritten += count as u64;
                output
            }
            Err(e) => {
                tracing::warn!("{}; saving page without local references", e);
                page.body.clone()
            }
        };

        self.save_page(
            job,
            &page.final_url,
            &page_path,
            &output,
            parsed.title.as_deref(),
            Some(encoding),
        )
        .await;
    }

    /// Submits new resources, waits for their outcomes, and plans rewrites
    ///
    /// Resources already handled for an earlier page reuse the recorded
    /// outcome. Only references whose resource is available locally end up
    /// in the returned plan.
    async fn download_resources(
        &mut self,
        page_path: &Path,
        references: &[ResourceReference],
        scheduler: &DownloadScheduler,
    ) -> RewritePlan {
        let mut tickets = Vec::new();

        for reference in references {
            let key = reference.resolved_url.as_str();
            if self.resources.contains_key(key) || !self.visited.insert_if_new(key) {
                continue;
            }

            let job = DownloadJob {
                remote_url: reference.resolved_url.clone(),
                local_path: self.registry.claim(&reference.resolved_url),
                size_limit: self.config.download.max_file_size,
                overwrite_policy: self.config.download.overwrite,
            };

            match scheduler.submit(job) {
                Ok(ticket) => tickets.push(ticket),
                Err(error) => {
                    let outcome = DownloadOutcome::Failed { attempts: 0, error };
                    self.report.record_download(key, &outcome);
                    self.resources.insert(key.to_string(), false);
                }
            }
        }

        let outcomes = futures::future::join_all(tickets.into_iter().map(|ticket| async move {
            let url = ticket.url().to_string();
            (url, ticket.outcome().await)
        }))
        .await;

        for (url, outcome) in outcomes {
            self.report.record_download(&url, &outcome);
            self.resources.insert(url, outcome.is_available());
        }

        let mut plan = RewritePlan::new();
        for reference in references {
            let key = reference.resolved_url.as_str();
            if self.resources.get(key) != Some(&true) {
                continue;
            }
            let Some(local_path) = self.registry.get(key) else {
                continue;
            };
            if let Some(link) = relative_link(page_path, local_path) {
                plan.insert(reference, link);
            }
        }
        plan
    }

    /// Queues a page link one level deeper, if it qualifies
    fn enqueue_page_link(&mut self, parent: &CrawlJob, url: Url, frontier: &mut VecDeque<CrawlJob>) {
        if !self.config.crawler.follow_external
            && !self.home_hosts.iter().any(|home| same_host(home, &url))
        {
            tracing::trace!("Not following external link {}", url);
            self.report.external_links_skipped += 1;
            return;
        }

        let child = parent.child(url);
        if self.visited.contains(child.url.as_str()) {
            return;
        }

        if child.depth > self.config.crawler.max_depth {
            tracing::trace!("Not following {}: beyond max depth", child.url);
            self.report.links_beyond_depth += 1;
            return;
        }

        if self.visited.insert_if_new(child.url.as_str()) {
            tracing::debug!("Queued {} at depth {}", child.url, child.depth);
            frontier.push_back(child);
        }
    }

    /// Writes a page; HTML pages (those with an encoding) are remembered
    /// for the page-link pass
    async fn save_page(
        &mut self,
        job: &CrawlJob,
        base_url: &Url,
        path: &Path,
        contents: &[u8],
        title: Option<&str>,
        html_encoding: Option<&'static Encoding>,
    ) {
        let url = job.url.as_str();

        match write_file(path, contents).await {
            Ok(()) => {
                match title {
                    Some(title) => {
                        tracing::info!("Saved page {} \"{}\" -> {}", url, title, path.display())
                    }
                    None => tracing::info!("Saved page {} -> {}", url, path.display()),
                }
                self.report.record_page(url, PageOutcome::Saved, None);

                if let Some(encoding) = html_encoding {
                    self.saved_pages.push(SavedPage {
                        url: job.url.clone(),
                        base_url: base_url.clone(),
                        path: path.to_path_buf(),
                        encoding,
                    });
                }
            }
            Err(e) => {
                tracing::error!("Failed to save page {}: {}", url, e);
                self.report
                    .record_page(url, PageOutcome::WriteFailed, Some(e.to_string()));
            }
        }
    }
}
