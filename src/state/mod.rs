//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: where the crawl loop is (seeded, crawling at a depth, done)
//! - `VisitedSet`: every URL processed in this run
//! - `Frontier`: URLs discovered at the current depth, pending the next wave
//!
//! Nothing here is persisted; every run starts cold.

mod frontier;
mod phase;

// Re-export main types
pub use frontier::{Frontier, VisitedSet};
pub use phase::CrawlPhase;
