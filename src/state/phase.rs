/// Crawl phase definitions for tracking crawl progress
use std::fmt;

/// Where the crawl loop currently is
///
/// The loop moves strictly forward: `Seeded -> Crawling(0) -> ... -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Seeds are normalized into the first frontier; nothing fetched yet
    Seeded,

    /// A wave is running (or has just been folded) at this depth
    Crawling { depth: u32 },

    /// Depth limit reached or the frontier ran dry
    Done,
}

impl CrawlPhase {
    /// Returns true once the crawl has finished
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Depth of the current wave, if one is running
    pub fn depth(&self) -> Option<u32> {
        match self {
            Self::Crawling { depth } => Some(*depth),
            _ => None,
        }
    }

    /// Checks that moving to `next` keeps the loop moving forward
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (self, next) {
            (Self::Seeded, Self::Crawling { depth: 0 }) => true,
            (Self::Seeded, Self::Done) => true,
            (Self::Crawling { depth }, Self::Crawling { depth: next }) => next == depth + 1,
            (Self::Crawling { .. }, Self::Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seeded => write!(f, "seeded"),
            Self::Crawling { depth } => write!(f, "crawling(depth {})", depth),
            Self::Done => write!(f, "done"),
        }
    }
}
