//! Page fetching with retries
//!
//! Each attempt draws a fresh proxy and renders the page with cache bypass.
//! A failed attempt is logged with the proxy it used, then the next one starts
//! after a fixed delay. Running out of attempts is not an error: the URL
//! simply becomes a `Failed` result.

use crate::config::{CrawlerConfig, TimeoutConfig};
use crate::crawler::renderer::{PageRenderer, RenderOptions};
use crate::proxy::{ProxyCredential, ProxyPool};
use crate::url::CrawlUrl;
use std::time::Duration;

/// Reason carried by a page that exhausted its attempts
pub const GIVE_UP: &str = "give up";

/// Outcome of processing one URL in one wave
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// The page rendered
    Success {
        /// The URL that was requested
        url: CrawlUrl,
        /// URL after redirects
        final_url: String,
        /// Extracted text
        text: String,
        /// Same-site links found on the page
        links: Vec<String>,
    },

    /// The URL was a document and is now on disk
    Downloaded { url: CrawlUrl, filename: String },

    /// Nothing usable came back
    Failed { url: CrawlUrl, reason: String },
}

impl FetchResult {
    /// The URL this result is for
    pub fn url(&self) -> &CrawlUrl {
        match self {
            Self::Success { url, .. } | Self::Downloaded { url, .. } | Self::Failed { url, .. } => {
                url
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// How hard `fetch_page` tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,

    /// Pause between two attempts
    pub delay: Duration,

    pub render: RenderOptions,
}

impl RetryPolicy {
    pub fn from_config(crawler: &CrawlerConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            max_retries: crawler.max_retries,
            delay: crawler.retry_delay(),
            render: RenderOptions {
                timeout: timeouts.render(),
                ..RenderOptions::default()
            },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_secs(1),
            render: RenderOptions::default(),
        }
    }
}

fn proxy_label(proxy: Option<&ProxyCredential>) -> &str {
    proxy.map(|p| p.server.as_str()).unwrap_or("none")
}

/// Renders `url`, retrying up to `policy.max_retries` times
///
/// # Returns
///
/// `FetchResult::Success` from the first successful attempt, otherwise
/// `FetchResult::Failed` with reason [`GIVE_UP`].
pub async fn fetch_page(
    renderer: &dyn PageRenderer,
    proxies: &ProxyPool,
    url: &CrawlUrl,
    policy: &RetryPolicy,
) -> FetchResult {
    let attempts = policy.max_retries.max(1);

    for attempt in 1..=attempts {
        let proxy = proxies.next();

        let failure = match renderer
            .render(url.as_url(), proxy.as_ref(), &policy.render)
            .await
        {
            Ok(page) if page.success => {
                tracing::info!("[OK] {}", url);
                return FetchResult::Success {
                    url: url.clone(),
                    final_url: page.final_url,
                    text: page.markdown,
                    links: page.internal_links,
                };
            }
            Ok(page) => page
                .error_message
                .unwrap_or_else(|| "render unsuccessful".to_string()),
            Err(e) => e.to_string(),
        };

        tracing::warn!(
            "[RETRY {}/{}] {} failed via proxy {}: {}",
            attempt,
            attempts,
            url,
            proxy_label(proxy.as_ref()),
            failure
        );

        if attempt < attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    tracing::warn!("[GIVE UP] {} after {} attempts", url, attempts);
    FetchResult::Failed {
        url: url.clone(),
        reason: GIVE_UP.to_string(),
    }
}
