//! URL handling module for Wavecrawl
//!
//! This module provides URL normalization (the dedup key for the whole
//! crawl) and the domain scope links are filtered against.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::DomainScope;
pub use normalize::{normalize_url, CrawlUrl};
