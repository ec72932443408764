//! Ripple-Frontier main entry point
//!
//! This is the command-line interface for the Ripple-Frontier crawler.

use clap::Parser;
use ripple_frontier::config::{load_config_with_hash, Config, SeedEntry};
use ripple_frontier::crawler::crawl;
use ripple_frontier::queue::{Partition, RequestQueue};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Ripple-Frontier: a persistent, polite crawl frontier
///
/// Drains a durable request queue with a pool of workers, respecting a
/// shared rate limit and, optionally, robots.txt. Interrupted crawls resume
/// from the data directory.
#[derive(Parser, Debug)]
#[command(name = "ripple-frontier")]
#[command(version)]
#[command(about = "A persistent, polite crawl frontier", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear every queue partition before seeding
    #[arg(long, conflicts_with = "stats")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show queue partition counts and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Extra seed URL (repeatable)
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Label for the --url seeds
    #[arg(long, requires = "urls")]
    label: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    config.seeds.extend(cli.urls.iter().map(|url| SeedEntry {
        url: url.clone(),
        label: cli.label.clone(),
    }));

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_frontier=info,warn"),
            1 => EnvFilter::new("ripple_frontier=debug,info"),
            2 => EnvFilter::new("ripple_frontier=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration and seeds
fn handle_dry_run(config: &Config) {
    println!("=== Ripple-Frontier Dry Run ===\n");

    println!("Crawler:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Obey robots.txt: {}", config.crawler.obey_politeness);
    println!("  User agent: {}", config.crawler.user_agent);
    println!(
        "  Navigation timeout: {}s",
        config.crawler.navigation_timeout_secs
    );

    println!("\nRequest limit:");
    println!(
        "  {} requests per {}s",
        config.request_limit.max_requests, config.request_limit.period_seconds
    );

    println!("\nStorage:");
    println!("  Data dir: {}", config.storage.data_dir.display());

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        match &seed.label {
            Some(label) => println!("  - {} [{}]", seed.url, label),
            None => println!("  - {}", seed.url),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows partition counts of the data directory
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Data dir: {}\n", config.storage.data_dir.display());

    let queue = RequestQueue::open(&config.storage.data_dir)?;
    for partition in Partition::ALL {
        println!(
            "  {:<10} {}",
            partition.store_name(),
            queue.partition_len(partition)?
        );
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (clearing previous queue state)");
    } else {
        tracing::info!("Starting crawl (resuming any pending requests)");
    }
    tracing::info!("Seed URLs: {}", config.seeds.len());

    match crawl(config, fresh).await {
        Ok(report) => {
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
