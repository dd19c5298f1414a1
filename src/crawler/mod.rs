//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP plumbing and the renderer / byte fetcher seams
//! - Download-vs-render classification and document downloads
//! - Page rendering with retries and proxy rotation
//! - Admission control and the depth-wave crawl loop

mod classifier;
mod coordinator;
mod downloader;
mod fetcher;
mod http;
mod parser;
mod renderer;
mod scheduler;

pub use classifier::{
    classify, classify_headers, has_document_extension, Classification, DOCUMENT_EXTENSIONS,
};
pub use coordinator::{run_crawl, Coordinator};
pub use downloader::{download, filename_from_disposition, filename_from_url, FALLBACK_FILENAME};
pub use fetcher::{fetch_page, FetchResult, RetryPolicy, GIVE_UP};
pub use http::{build_http_client, BodyStream, ByteFetcher, ClientPool, HttpFetcher, ResponseHead};
pub use parser::{parse_html, ParsedPage};
pub use renderer::{HttpRenderer, PageRenderer, RenderOptions, RenderedPage};
pub use scheduler::{MemoryGate, Scheduler};

use crate::config::Config;
use crate::output::CrawlReport;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Normalize the seeds and fix the domain scope
/// 2. Load proxies and build the HTTP clients
/// 3. Crawl wave by wave up to the configured depth
/// 4. Write the summary, if one is configured
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished
/// * `Err(WaveError)` - Startup failed
pub async fn crawl(config: Config) -> Result<CrawlReport> {
    run_crawl(config).await
}
