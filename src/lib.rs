//! Wavecrawl: a depth-bounded recursive site crawler
//!
//! This crate crawls a single site breadth-first, one depth per wave,
//! rendering pages to text, downloading documents, and following same-domain
//! links under a global concurrency bound with retries and proxy rotation.

pub mod config;
pub mod crawler;
pub mod output;
pub mod proxy;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Wavecrawl operations
#[derive(Debug, Error)]
pub enum WaveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Render failed for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WaveError {
    /// Maps a reqwest failure for `url`, separating timeouts from other
    /// transport errors
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Malformed proxy on line {line}: '{content}' (expected ip:port:user:pass)")]
    InvalidProxy { line: usize, content: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Wavecrawl operations
pub type Result<T> = std::result::Result<T, WaveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, FetchResult};
pub use proxy::{ProxyCredential, ProxyPool};
pub use state::CrawlPhase;
pub use url::{normalize_url, CrawlUrl, DomainScope};
