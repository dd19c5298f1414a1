//! Wavecrawl main entry point
//!
//! This is the command-line interface for the Wavecrawl site crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use wavecrawl::config::{load_config_with_hash, validate, Config};
use wavecrawl::crawler::crawl;
use tracing_subscriber::EnvFilter;

/// Wavecrawl: a depth-bounded recursive site crawler
///
/// Wavecrawl crawls one site breadth-first, a depth at a time. Pages are
/// rendered to text under the output directory, documents are downloaded,
/// and same-domain links are followed until the depth limit is reached.
#[derive(Parser, Debug)]
#[command(name = "wavecrawl")]
#[command(version)]
#[command(about = "A depth-bounded recursive site crawler", long_about = None)]
struct Cli {
    /// Seed URLs; the host of the first one scopes the crawl
    #[arg(value_name = "URL")]
    seeds: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of depth waves to run
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Maximum number of URLs processed at once
    #[arg(short = 'j', long)]
    max_concurrent: Option<usize>,

    /// Route requests through the proxies in FILE (ip:port:user:pass per line)
    #[arg(long, value_name = "FILE")]
    proxies: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wavecrawl=info,warn"),
            1 => EnvFilter::new("wavecrawl=debug,info"),
            2 => EnvFilter::new("wavecrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Layers command-line flags over the file configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if !cli.seeds.is_empty() {
        config.crawler.seeds = cli.seeds.clone();
    }
    if let Some(depth) = cli.max_depth {
        config.crawler.max_depth = depth;
    }
    if let Some(concurrent) = cli.max_concurrent {
        config.crawler.max_concurrent = concurrent;
    }
    if let Some(file) = &cli.proxies {
        config.proxy.enabled = true;
        config.proxy.file = file.clone();
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Wavecrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max concurrent: {}", config.crawler.max_concurrent);
    println!(
        "  Max retries: {} ({}ms apart)",
        config.crawler.max_retries, config.crawler.retry_delay_ms
    );

    println!("\nTimeouts:");
    println!("  Probe: {}s", config.timeouts.probe_secs);
    println!("  Download: {}s", config.timeouts.download_secs);
    println!("  Render: {}s", config.timeouts.render_secs);

    println!("\nMemory Gate:");
    match config.memory.threshold_percent {
        Some(threshold) => println!(
            "  Hold admission above {:.1}% (checked every {}ms, up to {}s)",
            threshold, config.memory.check_interval_ms, config.memory.max_wait_secs
        ),
        None => println!("  Disabled"),
    }

    println!("\nProxies:");
    if config.proxy.enabled {
        println!("  From: {}", config.proxy.file.display());
    } else {
        println!("  Disabled");
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Pages: {}", config.output.directory.display());
    println!("  Documents: {}", config.output.docs_directory.display());
    println!("  Link map: {}", config.output.link_map.display());
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary.display());
    }

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!("Total seed URLs: {}", config.crawler.seeds.len());

    let report = crawl(config).await.context("Crawl failed")?;

    tracing::info!(
        "Crawl completed successfully: depth {}, {} URLs visited",
        report.depth_reached,
        report.visited.len()
    );
    if let Some(duration) = report.duration_seconds() {
        tracing::info!("Elapsed: {}s", duration);
    }

    Ok(())
}
