use crate::UrlError;
use std::fmt;
use url::Url;

/// A normalized URL, the sole key for visited/frontier membership
///
/// Two `CrawlUrl`s are equal iff they name the same page for crawling
/// purposes. Only [`normalize_url`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrawlUrl(Url);

impl CrawlUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Host of the URL (always present and lowercase)
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Path component, lowercase and without trailing slash
    pub fn path(&self) -> &str {
        self.0.path()
    }
}

impl fmt::Display for CrawlUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Normalizes a URL for deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed, not http(s), or hostless
/// 2. Remove fragment (everything after #)
/// 3. Lowercase scheme and host (done by the parser for http(s))
/// 4. Lowercase the path
/// 5. Strip trailing slashes from the path; an empty path stays the root
///
/// The query string is kept as-is. Normalization is idempotent.
///
/// # Examples
///
/// ```
/// use wavecrawl::url::normalize_url;
///
/// let a = normalize_url("HTTP://Example.com/a/").unwrap();
/// let b = normalize_url("http://example.com/a#frag").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "http://example.com/a");
/// ```
pub fn normalize_url(url_str: &str) -> Result<CrawlUrl, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    let path = url.path().to_lowercase();
    // http(s) URLs always keep a leading '/', so "" reads back as the root
    url.set_path(path.trim_end_matches('/'));

    Ok(CrawlUrl(url))
}
