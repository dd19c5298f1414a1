//! Crawl report and its markdown rendering

use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;

/// What one crawl run did
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Seeds as given, after normalization
    pub seeds: Vec<String>,

    /// Number of waves that actually ran
    pub depth_reached: u32,

    /// Pages whose text was written to disk
    pub pages_written: usize,

    /// Documents saved by the downloader
    pub documents_downloaded: usize,

    /// URLs that ended as failures (gave up, download error, task panic)
    pub failures: usize,

    /// Every URL marked visited, sorted
    pub visited: Vec<String>,
}

impl CrawlReport {
    pub fn new(seeds: Vec<String>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            seeds,
            depth_reached: 0,
            pages_written: 0,
            documents_downloaded: 0,
            failures: 0,
            visited: Vec::new(),
        }
    }

    /// Wall-clock duration in seconds, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Formats a report as markdown
pub fn format_summary(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Wavecrawl Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    md.push_str(&format!("- **Depth Reached**: {}\n\n", report.depth_reached));

    md.push_str("## Seeds\n\n");
    for seed in &report.seeds {
        md.push_str(&format!("- {}\n", seed));
    }
    md.push('\n');

    md.push_str("## Results\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Pages written | {} |\n", report.pages_written));
    md.push_str(&format!(
        "| Documents downloaded | {} |\n",
        report.documents_downloaded
    ));
    md.push_str(&format!("| Failures | {} |\n", report.failures));
    md.push_str(&format!("| URLs visited | {} |\n\n", report.visited.len()));

    if !report.visited.is_empty() {
        md.push_str("## Visited URLs\n\n");
        for url in &report.visited {
            md.push_str(&format!("- {}\n", url));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str(&format!(
        "*Generated by wavecrawl v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    md
}

/// Writes the markdown summary to `path`, creating parent directories
pub fn write_summary(report: &CrawlReport, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format_summary(report))
}
