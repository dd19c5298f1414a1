//! Crawler coordinator - the depth-wave crawl loop
//!
//! Each depth is one wave: every pending URL is classified and then either
//! downloaded or rendered, concurrently and under the scheduler's bound. The
//! wave ends only when every unit has returned. Results are then folded back
//! into the visited set, page text is written, and the next frontier is built
//! from the same-domain links that have not been seen yet.
//!
//! Units never touch crawl state; only the coordinator mutates the visited
//! set and the frontier, and only between waves.

use crate::config::Config;
use crate::crawler::classifier::{classify, Classification};
use crate::crawler::downloader::download;
use crate::crawler::fetcher::{fetch_page, FetchResult, RetryPolicy};
use crate::crawler::http::{ByteFetcher, ClientPool, HttpFetcher};
use crate::crawler::renderer::{HttpRenderer, PageRenderer};
use crate::crawler::scheduler::Scheduler;
use crate::output::{write_summary, CrawlReport, LinkMap, PageWriter};
use crate::proxy::ProxyPool;
use crate::state::{CrawlPhase, Frontier, VisitedSet};
use crate::url::{normalize_url, CrawlUrl, DomainScope};
use crate::{ConfigError, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything a unit needs, shared read-only across the wave's tasks
pub(crate) struct CrawlContext {
    renderer: Arc<dyn PageRenderer>,
    fetcher: Arc<dyn ByteFetcher>,
    proxies: ProxyPool,
    link_map: LinkMap,
    docs_dir: PathBuf,
    policy: RetryPolicy,
    probe_timeout: Duration,
    download_timeout: Duration,
}

/// Processes one URL: classify, then download or render
///
/// Never fails; every problem ends up in the returned `FetchResult`.
pub(crate) async fn crawl_unit(ctx: &CrawlContext, url: CrawlUrl) -> FetchResult {
    let proxy = ctx.proxies.next();

    let classification = classify(
        ctx.fetcher.as_ref(),
        &url,
        proxy.as_ref(),
        ctx.probe_timeout,
    )
    .await;

    if classification != Classification::Downloadable {
        return fetch_page(ctx.renderer.as_ref(), &ctx.proxies, &url, &ctx.policy).await;
    }

    match download(
        ctx.fetcher.as_ref(),
        &url,
        proxy.as_ref(),
        &ctx.docs_dir,
        &ctx.link_map,
        ctx.download_timeout,
    )
    .await
    {
        Ok(filename) => FetchResult::Downloaded { url, filename },
        Err(e) => {
            tracing::warn!("[DOWNLOAD ERROR] {}: {}", url, e);
            FetchResult::Failed {
                url,
                reason: e.to_string(),
            }
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    ctx: Arc<CrawlContext>,
    scheduler: Scheduler,
    scope: DomainScope,
    seeds: Vec<CrawlUrl>,
    visited: VisitedSet,
    frontier: Frontier,
    phase: CrawlPhase,
    pages: PageWriter,
}

impl Coordinator {
    /// Creates a coordinator with the built-in HTTP renderer and fetcher
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration (already validated)
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run; nothing has been written yet
    /// * `Err(WaveError)` - Bad seeds, unreadable proxy file, or I/O failure
    pub async fn new(config: Config) -> Result<Self> {
        let proxies = ProxyPool::from_config(&config.proxy)?;
        let clients = Arc::new(ClientPool::new(config.user_agent.clone())?);

        let renderer: Arc<dyn PageRenderer> = Arc::new(HttpRenderer::new(Arc::clone(&clients)));
        let fetcher: Arc<dyn ByteFetcher> = Arc::new(HttpFetcher::new(clients));

        Self::with_collaborators(config, proxies, renderer, fetcher).await
    }

    /// Creates a coordinator around caller-supplied collaborators
    pub async fn with_collaborators(
        config: Config,
        proxies: ProxyPool,
        renderer: Arc<dyn PageRenderer>,
        fetcher: Arc<dyn ByteFetcher>,
    ) -> Result<Self> {
        let seeds = config
            .crawler
            .seeds
            .iter()
            .map(|seed| normalize_url(seed))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let Some(first) = seeds.first() else {
            return Err(ConfigError::Validation("At least one seed URL is required".into()).into());
        };
        let scope = DomainScope::from_seed(first);

        let link_map = LinkMap::new(config.output.link_map.clone());

        let ctx = CrawlContext {
            renderer,
            fetcher,
            proxies,
            link_map,
            docs_dir: config.output.docs_directory.clone(),
            policy: RetryPolicy::from_config(&config.crawler, &config.timeouts),
            probe_timeout: config.timeouts.probe(),
            download_timeout: config.timeouts.download(),
        };

        Ok(Self {
            scheduler: Scheduler::from_config(&config.crawler, &config.memory),
            pages: PageWriter::new(config.output.directory.clone()),
            frontier: seeds.iter().cloned().collect(),
            visited: VisitedSet::new(),
            phase: CrawlPhase::Seeded,
            ctx: Arc::new(ctx),
            scope,
            seeds,
            config,
        })
    }

    /// Runs the crawl until the depth limit is hit or the frontier runs dry
    ///
    /// Per-URL failures never abort the run; only a failure creating the
    /// link map or writing the summary file is returned as an error.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let max_depth = self.config.crawler.max_depth;
        let mut report = CrawlReport::new(self.seeds.iter().map(|s| s.to_string()).collect());

        tracing::info!(
            "Starting crawl of {} (max depth {}, {} concurrent, {} proxies)",
            self.scope.host(),
            max_depth,
            self.scheduler.max_concurrent(),
            self.ctx.proxies.len()
        );

        for depth in 0..max_depth {
            let urls = self.frontier.pending(&self.visited);
            if urls.is_empty() {
                tracing::info!("Frontier is empty at depth {}, crawl complete", depth);
                break;
            }

            if depth == 0 {
                self.ctx.link_map.start().await?;
            }

            self.advance(CrawlPhase::Crawling { depth });
            tracing::info!("Depth {}: crawling {} URLs", depth, urls.len());

            let results = self.run_wave(urls).await;
            report.depth_reached = depth + 1;

            self.frontier = self.fold(results, &mut report).await;
            tracing::info!(
                "Depth {} done: {} visited, {} URLs queued for next depth",
                depth,
                self.visited.len(),
                self.frontier.len()
            );
        }

        self.advance(CrawlPhase::Done);

        report.finished_at = Some(Utc::now());
        report.visited = self
            .visited
            .sorted()
            .into_iter()
            .map(|url| url.to_string())
            .collect();

        tracing::info!(
            "Crawl completed: {} pages written, {} documents downloaded, {} failures",
            report.pages_written,
            report.documents_downloaded,
            report.failures
        );

        if let Some(path) = &self.config.output.summary_path {
            write_summary(&report, path)?;
            tracing::info!("Summary written to {}", path.display());
        }

        Ok(report)
    }

    /// Runs one unit per URL and waits for all of them
    async fn run_wave(&self, urls: Vec<CrawlUrl>) -> Vec<FetchResult> {
        let mut results = Vec::with_capacity(urls.len());
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let Some(permit) = self.scheduler.acquire().await else {
                results.push(FetchResult::Failed {
                    url,
                    reason: "scheduler closed".to_string(),
                });
                continue;
            };

            let ctx = Arc::clone(&self.ctx);
            let unit_url = url.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                crawl_unit(&ctx, unit_url).await
            });
            handles.push((url, handle));
        }

        // Barrier
        for (url, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Unit for {} did not finish: {}", url, e);
                    results.push(FetchResult::Failed {
                        url,
                        reason: format!("unit aborted: {}", e),
                    });
                }
            }
        }

        results
    }

    /// Folds a finished wave into crawl state and returns the next frontier
    async fn fold(&mut self, results: Vec<FetchResult>, report: &mut CrawlReport) -> Frontier {
        let mut links: Vec<String> = Vec::new();

        for result in results {
            self.visited.insert(result.url().clone());

            match result {
                FetchResult::Success {
                    url,
                    final_url,
                    text,
                    links: page_links,
                } => {
                    if let Ok(final_norm) = normalize_url(&final_url) {
                        self.visited.insert(final_norm);
                    }

                    if text.trim().is_empty() {
                        tracing::debug!("No text extracted from {}", final_url);
                    } else {
                        match self.pages.write(&final_url, &text).await {
                            Ok(path) => {
                                report.pages_written += 1;
                                tracing::debug!("Wrote {} to {}", url, path.display());
                            }
                            Err(e) => tracing::warn!("Failed to write page for {}: {}", url, e),
                        }
                    }

                    links.extend(page_links);
                }
                FetchResult::Downloaded { .. } => report.documents_downloaded += 1,
                FetchResult::Failed { .. } => report.failures += 1,
            }
        }

        Frontier::from_links(links, &self.scope, &self.visited)
    }

    fn advance(&mut self, next: CrawlPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!("Phase {} -> {}", self.phase, next);
        self.phase = next;
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    /// URLs waiting for the next wave
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }
}

/// Runs a complete crawl with the built-in HTTP collaborators
pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
    let mut coordinator = Coordinator::new(config).await?;
    coordinator.run().await
}
