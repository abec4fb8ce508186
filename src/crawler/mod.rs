//! Crawler module for link discovery and status checking
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `PageFetcher` trait
//! - HTML anchor extraction
//! - Per-host parallelism and random request delay
//! - Status resolution with HEAD fallbacks
//! - Overall crawl coordination and interrupt handling

pub mod cache;
mod coordinator;
mod fetcher;
mod interrupt;
mod limiter;
mod parser;
mod resolver;

pub use cache::{CachedResponse, ResponseCache};
pub use coordinator::{Coordinator, CrawlOutcome};
pub use fetcher::{
    build_http_clients, FetchError, FetchErrorKind, FetchEvent, HttpFetcher, PageFetcher,
    RedirectGuard,
};
pub use interrupt::spawn_interrupt_listener;
pub use limiter::HostLimiter;
pub use parser::{extract_anchors, is_html};
pub use resolver::{GetRoute, Resolution, StatusResolver};

use crate::config::Config;
use crate::output::ReportRow;
use crate::state::CrawlSession;
use crate::url::parse_absolute;
use crate::RobocopError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Result of a crawl: how it ended and the report rows
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    pub rows: Vec<ReportRow>,
}

impl CrawlReport {
    pub fn interrupted(&self) -> bool {
        self.outcome == CrawlOutcome::Interrupted
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Parse the seed URL from `config.crawler.host`
/// 2. Build the HTTP fetcher and event channel
/// 3. Fetch the seed and follow links until nothing is outstanding or
///    `cancel` fires
/// 4. Finalize the session into report rows
///
/// An interrupted crawl still returns `Ok` with the rows resolved so far.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `cancel` - Token that stops the crawl early
pub async fn run_crawl(
    config: &Config,
    cancel: CancellationToken,
) -> Result<CrawlReport, RobocopError> {
    let seed = parse_absolute(&config.crawler.host)?;
    let session = Arc::new(CrawlSession::from_config(seed.clone(), config));

    let (tx, rx) = mpsc::unbounded_channel();
    let guard: Arc<dyn RedirectGuard> = session.clone();
    let fetcher = HttpFetcher::new(seed, config, Some(guard), tx)?;

    let mut coordinator = Coordinator::new(Arc::clone(&session), fetcher, rx, cancel);
    let outcome = coordinator.run().await;

    let rows = session.finalize().unwrap_or_default();
    tracing::info!(
        "Report has {} rows{}",
        rows.len(),
        if session.only_failures() {
            " (http links with a working https variant hidden)"
        } else {
            ""
        }
    );

    Ok(CrawlReport { outcome, rows })
}
