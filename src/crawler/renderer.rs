//! Page rendering
//!
//! The crawl loop only needs "give me the text and links of this URL". The
//! `PageRenderer` trait is that seam; `HttpRenderer` is the built-in
//! implementation that fetches HTML with reqwest and converts it with the
//! HTML parser. A headless browser can be plugged in behind the same trait.

use crate::crawler::http::ClientPool;
use crate::crawler::parser::parse_html;
use crate::proxy::ProxyCredential;
use crate::{Result, WaveError};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Per-render settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Ask every cache on the way to serve a fresh copy
    pub cache_bypass: bool,

    /// Hand back partial content as it arrives (unsupported by `HttpRenderer`)
    pub stream: bool,

    /// Upper bound for one render
    pub timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cache_bypass: true,
            stream: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome reported by a renderer
///
/// `success == false` is a soft failure (bad status, blocked page); hard
/// failures such as connection errors come back as `Err` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    pub success: bool,

    /// URL after redirects
    pub final_url: String,

    /// Extracted text, markdown-flavoured
    pub markdown: String,

    /// Absolute links on the same site as the page
    pub internal_links: Vec<String>,

    pub error_message: Option<String>,
}

impl RenderedPage {
    /// A soft failure for `url`
    pub fn failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            final_url: url.into(),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Fetches a URL and returns its rendered text plus outbound links
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredential>,
        options: &RenderOptions,
    ) -> Result<RenderedPage>;
}

/// Static HTML renderer over reqwest + scraper
pub struct HttpRenderer {
    clients: Arc<ClientPool>,
}

impl HttpRenderer {
    pub fn new(clients: Arc<ClientPool>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(
        &self,
        url: &Url,
        proxy: Option<&ProxyCredential>,
        options: &RenderOptions,
    ) -> Result<RenderedPage> {
        let client = self.clients.client(proxy)?;

        let mut request = client.get(url.clone()).timeout(options.timeout);
        if options.cache_bypass {
            request = request
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| WaveError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Ok(RenderedPage::failed(
                final_url.as_str(),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WaveError::from_reqwest(url.as_str(), e))?;

        let parsed = parse_html(&body, &final_url);
        tracing::trace!(
            "Rendered {} ({} internal, {} external links)",
            final_url,
            parsed.internal_links.len(),
            parsed.external_links.len()
        );

        Ok(RenderedPage {
            success: true,
            final_url: final_url.to_string(),
            markdown: parsed.markdown,
            internal_links: parsed.internal_links,
            error_message: None,
        })
    }
}
