use crate::url::{CrawlUrl, DomainScope};
use std::collections::HashSet;

/// URLs already processed in this run, successfully or not
///
/// Only grows; there is no removal.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    urls: HashSet<CrawlUrl>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a URL visited; returns false if it already was
    pub fn insert(&mut self, url: CrawlUrl) -> bool {
        self.urls.insert(url)
    }

    pub fn contains(&self, url: &CrawlUrl) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrawlUrl> {
        self.urls.iter()
    }

    /// Visited URLs in a stable order
    pub fn sorted(&self) -> Vec<CrawlUrl> {
        let mut urls: Vec<CrawlUrl> = self.urls.iter().cloned().collect();
        urls.sort();
        urls
    }
}

/// URLs discovered at the current depth
///
/// Set semantics dedupe a URL linked from several pages in the same wave.
/// The crawl loop replaces the frontier wholesale after every wave.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    urls: HashSet<CrawlUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: CrawlUrl) -> bool {
        self.urls.insert(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Frontier entries not yet visited, in a stable order
    pub fn pending(&self, visited: &VisitedSet) -> Vec<CrawlUrl> {
        let mut urls: Vec<CrawlUrl> = self
            .urls
            .iter()
            .filter(|url| !visited.contains(url))
            .cloned()
            .collect();
        urls.sort();
        urls
    }

    /// Builds the next frontier from links collected during a wave
    ///
    /// Links that fail to normalize, leave the domain scope, or were already
    /// visited are dropped.
    pub fn from_links<I, S>(links: I, scope: &DomainScope, visited: &VisitedSet) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = Self::new();

        for link in links {
            let link = link.as_ref();
            let normalized = match crate::url::normalize_url(link) {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!("Dropping link {}: {}", link, e);
                    continue;
                }
            };

            if !scope.contains(&normalized) {
                tracing::trace!("Dropping off-domain link {}", normalized);
                continue;
            }

            if visited.contains(&normalized) {
                continue;
            }

            next.insert(normalized);
        }

        next
    }
}

impl FromIterator<CrawlUrl> for Frontier {
    fn from_iter<T: IntoIterator<Item = CrawlUrl>>(iter: T) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}
