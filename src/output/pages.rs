//! Extracted page text on disk
//!
//! One file per page, named after the page's final URL with every character
//! outside `[A-Za-z0-9_-]` replaced by `_`.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Longest sanitized stem kept before truncation
pub const MAX_STEM_LEN: usize = 200;

/// Maps a URL to a file stem usable on any filesystem
///
/// Stems longer than [`MAX_STEM_LEN`] are cut and suffixed with 16 hex
/// characters of the URL's SHA-256 so distinct long URLs stay distinct.
///
/// # Example
///
/// ```
/// use wavecrawl::output::safe_filename;
///
/// assert_eq!(safe_filename("https://example.test/a"), "https___example_test_a");
/// ```
pub fn safe_filename(url: &str) -> String {
    let stem: String = url
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.len() <= MAX_STEM_LEN {
        return stem;
    }

    format!("{}_{}", &stem[..MAX_STEM_LEN], &url_digest(url)[..16])
}

/// Hex SHA-256 of a URL, used wherever a name must be unique per URL
pub(crate) fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Writes page text under a single output directory
#[derive(Debug, Clone)]
pub struct PageWriter {
    dir: PathBuf,
}

impl PageWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the text of `url` is written to
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.md", safe_filename(url)))
    }

    /// Writes `text` for `url`, replacing any earlier file
    ///
    /// The text goes to a temporary file first and is renamed into place,
    /// so readers never see a half-written page.
    pub async fn write(&self, url: &str, text: &str) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(url);
        let tmp = path.with_extension("md.tmp");

        tokio::fs::write(&tmp, text.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        Ok(path)
    }
}
