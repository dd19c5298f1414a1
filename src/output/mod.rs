//! Everything the crawl leaves on disk
//!
//! This module handles:
//! - Page text files (`<sanitized-url>.md`)
//! - The `url,filename` map of downloaded documents
//! - The end-of-run crawl report and its markdown summary

mod link_map;
mod pages;
mod summary;

pub use link_map::LinkMap;
pub use pages::{safe_filename, PageWriter, MAX_STEM_LEN};
pub(crate) use pages::url_digest;
pub use summary::{format_summary, write_summary, CrawlReport};
