use crate::url::normalize::CrawlUrl;

/// The host every followed link must share
///
/// Fixed for the whole crawl: it is taken from the first seed and never
/// changes, even if later seeds live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScope {
    host: String,
}

impl DomainScope {
    /// Builds the scope from the first seed
    pub fn from_seed(seed: &CrawlUrl) -> Self {
        Self {
            host: seed.host().to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if `url` is on the scoped host
    pub fn contains(&self, url: &CrawlUrl) -> bool {
        url.host() == self.host
    }
}
