use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Wavecrawl
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// usable configuration once seeds are supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub timeouts: TimeoutConfig,
    pub memory: MemoryConfig,
    pub proxy: ProxyConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Seed URLs; the host of the first one scopes the whole crawl
    pub seeds: Vec<String>,

    /// Number of depth waves to run (0 crawls nothing)
    pub max_depth: u32,

    /// Maximum number of URLs being processed at once
    pub max_concurrent: usize,

    /// Render attempts per page before giving up
    pub max_retries: u32,

    /// Fixed delay between render attempts (milliseconds)
    pub retry_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            max_depth: 3,
            max_concurrent: 10,
            max_retries: 5,
            retry_delay_ms: 1000,
        }
    }
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Network timeouts, in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimeoutConfig {
    /// Classification probe
    pub probe_secs: u64,

    /// Whole document download
    pub download_secs: u64,

    /// Single render attempt
    pub render_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 10,
            download_secs: 20,
            render_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub fn render(&self) -> Duration {
        Duration::from_secs(self.render_secs)
    }
}

/// Memory-pressure admission control
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MemoryConfig {
    /// System memory usage (percent) above which new units are delayed.
    /// `None` disables the check.
    pub threshold_percent: Option<f64>,

    /// How often memory usage is re-sampled (milliseconds)
    pub check_interval_ms: u64,

    /// Longest a unit is held back before it is admitted regardless
    pub max_wait_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            threshold_percent: Some(70.0),
            check_interval_ms: 1000,
            max_wait_secs: 30,
        }
    }
}

/// Proxy rotation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// Whether proxies are used at all
    pub enabled: bool,

    /// Credential file, one `ip:port:user:pass` per line
    pub file: PathBuf,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file: PathBuf::from("static/proxies.txt"),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "wavecrawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory for rendered page text
    pub directory: PathBuf,

    /// Directory for downloaded documents
    pub docs_directory: PathBuf,

    /// Append-only `url,filename` record of downloads
    pub link_map: PathBuf,

    /// Optional markdown summary written when the crawl ends
    pub summary_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            docs_directory: PathBuf::from("output/docs"),
            link_map: PathBuf::from("links_map.txt"),
            summary_path: None,
        }
    }
}
