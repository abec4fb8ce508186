//! Robocop main entry point
//!
//! This is the command-line interface for the Robocop link auditor.

use anyhow::Context;
use clap::Parser;
use robocop::config::{load_config, validate, Config};
use robocop::crawler::{run_crawl, spawn_interrupt_listener};
use robocop::output::render_report;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Robocop: a link-auditing crawler
///
/// Robocop crawls one site starting from the given host, checks every link it
/// finds (off-site links with HEAD only) and reports broken links and plain
/// `http` links together with the status of their `https` variant.
#[derive(Parser, Debug)]
#[command(name = "robocop")]
#[command(version)]
#[command(about = "Reports broken and insecure links on a website", long_about = None)]
struct Cli {
    /// Seed URL of the site to crawl
    #[arg(long, value_name = "URL")]
    host: Option<String>,

    /// Path to an optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write the report as CSV to stdout and to the CSV file
    #[arg(long)]
    csv: bool,

    /// Path of the CSV report file
    #[arg(long, value_name = "FILE")]
    csv_path: Option<String>,

    /// Hide http links whose https variant answers 200
    #[arg(long)]
    only_failures: bool,

    /// Maximum number of pages fetched with GET
    #[arg(long, value_name = "N")]
    max_visits: Option<u32>,

    /// Upper bound of the random delay before each request, in seconds
    #[arg(long, value_name = "SECS")]
    random_delay: Option<u64>,

    /// Concurrent requests per host
    #[arg(long, value_name = "N")]
    parallelism: Option<u32>,

    /// Directory of the response cache
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<String>,

    /// Disable the response cache
    #[arg(long)]
    no_cache: bool,
}

impl Cli {
    /// Applies command-line flags on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.crawler.host = host.clone();
        }
        if self.verbose > 0 {
            config.crawler.verbose = true;
        }
        if let Some(max_visits) = self.max_visits {
            config.crawler.max_visits = max_visits;
        }
        if let Some(random_delay) = self.random_delay {
            config.crawler.random_delay = random_delay;
        }
        if let Some(parallelism) = self.parallelism {
            config.crawler.parallelism = parallelism;
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.crawler.cache_dir = cache_dir.clone();
        }
        config.crawler.no_cache |= self.no_cache;

        config.output.csv |= self.csv;
        config.output.only_failures |= self.only_failures;
        if let Some(csv_path) = &self.csv_path {
            config.output.csv_path = csv_path.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);

    // A config file asking for verbose output counts as one -v
    let verbosity = if config.crawler.verbose {
        cli.verbose.max(1)
    } else {
        cli.verbose
    };
    setup_logging(verbosity, cli.quiet);

    validate(&config).context("Invalid configuration")?;
    tracing::info!(
        "Auditing {} (max visits: {}, parallelism: {})",
        config.crawler.host,
        config.crawler.max_visits,
        config.crawler.parallelism
    );

    let cancel = CancellationToken::new();
    let listener = spawn_interrupt_listener(cancel.clone());

    let report = run_crawl(&config, cancel.clone()).await?;
    render_report(&report.rows, &config.output).context("Failed to write report")?;

    if report.interrupted() {
        std::process::exit(1);
    }

    cancel.cancel();
    if let Err(e) = listener.await {
        tracing::error!("Interrupt listener failed: {}", e);
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
            0 => EnvFilter::new("robocop=info,warn"),
            1 => EnvFilter::new("robocop=debug,info"),
            2 => EnvFilter::new("robocop=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
