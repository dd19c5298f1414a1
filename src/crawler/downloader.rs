//! Document downloader
//!
//! Streams a classified document to the docs directory and records the
//! `url,filename` mapping. Downloads are attempted once; failures are
//! reported to the caller and never retried.

use crate::crawler::http::{BodyStream, ByteFetcher};
use crate::output::{url_digest, LinkMap};
use crate::proxy::ProxyCredential;
use crate::url::CrawlUrl;
use crate::{Result, WaveError};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Name used when neither the headers nor the URL provide one
pub const FALLBACK_FILENAME: &str = "downloaded_file";

/// Write buffer size; the body is flushed to disk in chunks of this size
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Pulls the `filename=` value out of a Content-Disposition header
pub fn filename_from_disposition(disposition: &str) -> Option<String> {
    let lower = disposition.to_lowercase();
    let start = lower.find("filename=")? + "filename=".len();

    let raw = disposition.get(start..)?.split(';').next()?;
    let name = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    sanitize_filename(name)
}

/// Last path segment of the URL, if it has one
pub fn filename_from_url(url: &CrawlUrl) -> Option<String> {
    url.as_url()
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(sanitize_filename)
}

/// Reduces a server-supplied name to a bare file name
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match base {
        "" | "." | ".." => None,
        _ => Some(base.to_string()),
    }
}

/// Downloads `url` into `docs_dir` and appends it to `link_map`
///
/// The body is streamed to a hidden temporary file named after the URL's
/// hash, so concurrent downloads never share one. The final name is chosen
/// by the link map; a name already taken in this run gets a hash suffix.
///
/// # Returns
///
/// * `Ok(String)` - The file name written under `docs_dir`
/// * `Err(WaveError)` - Network, status, or filesystem failure
pub async fn download(
    fetcher: &dyn ByteFetcher,
    url: &CrawlUrl,
    proxy: Option<&ProxyCredential>,
    docs_dir: &Path,
    link_map: &LinkMap,
    timeout: Duration,
) -> Result<String> {
    let body = fetcher.stream_body(url.as_url(), proxy, timeout).await?;

    if !body.head.is_success() {
        return Err(WaveError::HttpStatus {
            url: url.to_string(),
            status: body.head.status,
        });
    }

    let wanted = body
        .head
        .content_disposition
        .as_deref()
        .and_then(filename_from_disposition)
        .or_else(|| filename_from_url(url))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

    tokio::fs::create_dir_all(docs_dir).await?;
    let part_path = docs_dir.join(format!(".{}.part", &url_digest(url.as_str())[..16]));

    let written = match write_body(body, &part_path).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }
    };

    let filename = match link_map
        .commit(url.as_str(), &part_path, docs_dir, &wanted)
        .await
    {
        Ok(filename) => filename,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(WaveError::Download {
                url: url.to_string(),
                message: format!("could not store as {}: {}", wanted, e),
            });
        }
    };

    tracing::info!("[DOWNLOADED] {} -> {} ({} bytes)", url, filename, written);
    Ok(filename)
}

/// Streams the body into `path` and returns the byte count
async fn write_body(mut body: BodyStream, path: &Path) -> Result<u64> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut written: u64 = 0;

    while let Some(chunk) = body.chunks.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    Ok(written)
}
