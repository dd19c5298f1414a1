//! Download-vs-render classification
//!
//! A URL is a document to download when its path carries a document
//! extension, or when a short GET probe returns attachment / document
//! headers. Everything else is a page to render.

use crate::crawler::http::{ByteFetcher, ResponseHead};
use crate::proxy::ProxyCredential;
use crate::url::CrawlUrl;
use std::time::Duration;

/// Path suffixes that are downloaded without probing
pub const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".txt"];

/// Content-Type fragments that mark a document
const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd",
    "text/plain",
];

/// Result of classifying one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Save the raw bytes
    Downloadable,

    /// Render and follow links
    Page,

    /// The probe failed; callers render the URL as a page
    ClassifyFailed { reason: String },
}

impl Classification {
    /// True for anything that should go through the renderer
    pub fn is_page(&self) -> bool {
        !matches!(self, Self::Downloadable)
    }
}

/// Checks the path for a document extension (no I/O)
pub fn has_document_extension(url: &CrawlUrl) -> bool {
    let path = url.path().to_lowercase();
    DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Classifies from probe headers alone
pub fn classify_headers(head: &ResponseHead) -> Classification {
    let disposition = head
        .content_disposition
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    if disposition.contains("attachment") {
        return Classification::Downloadable;
    }

    let content_type = head
        .content_type
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    if DOCUMENT_MIME_TYPES
        .iter()
        .any(|mime| content_type.contains(mime))
    {
        return Classification::Downloadable;
    }

    Classification::Page
}

/// Decides whether `url` is a document or a page
///
/// # Arguments
///
/// * `fetcher` - Used for the header probe
/// * `url` - The URL to classify
/// * `proxy` - Proxy the probe goes through, if any
/// * `timeout` - Probe timeout
pub async fn classify(
    fetcher: &dyn ByteFetcher,
    url: &CrawlUrl,
    proxy: Option<&ProxyCredential>,
    timeout: Duration,
) -> Classification {
    if has_document_extension(url) {
        return Classification::Downloadable;
    }

    match fetcher.get_headers(url.as_url(), proxy, timeout).await {
        Ok(head) => classify_headers(&head),
        Err(e) => {
            tracing::warn!("[CHECK ERROR] {}: {}", url, e);
            Classification::ClassifyFailed {
                reason: e.to_string(),
            }
        }
    }
}
