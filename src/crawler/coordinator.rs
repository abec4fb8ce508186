//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns the receiving end of the fetch event channel and is
//! the only writer of the crawl session while the crawl runs. It:
//! - Dispatches the seed GET
//! - Records edges for every anchor and admits follow-up requests
//! - Applies status resolutions and HEAD fallbacks
//! - Drains until no dispatched request is outstanding, or stops early when
//!   the cancellation token fires

use crate::crawler::resolver::{GetRoute, Resolution, StatusResolver};
use crate::crawler::{FetchError, FetchEvent, PageFetcher};
use crate::state::{Admission, CrawlSession, RequestMethod};
use crate::url::{https_variant, is_fetchable, resolve_link};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use url::Url;

/// How the drain loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Every dispatched request produced its terminal event
    Completed,
    /// The cancellation token fired first
    Interrupted,
}

/// Main crawler coordinator structure
pub struct Coordinator<F: PageFetcher> {
    session: Arc<CrawlSession>,
    fetcher: F,
    resolver: StatusResolver,
    events: UnboundedReceiver<FetchEvent>,
    outstanding: usize,
    completed: usize,
    cancel: CancellationToken,
}

impl<F: PageFetcher> Coordinator<F> {
    /// Creates a coordinator over a session and the fetcher feeding `events`
    pub fn new(
        session: Arc<CrawlSession>,
        fetcher: F,
        events: UnboundedReceiver<FetchEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let resolver = StatusResolver::new(session.seed().clone());
        Self {
            session,
            fetcher,
            resolver,
            events,
            outstanding: 0,
            completed: 0,
            cancel,
        }
    }

    pub fn session(&self) -> &Arc<CrawlSession> {
        &self.session
    }

    /// Number of dispatched requests still waiting for a terminal event
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Dispatches the seed page
    pub fn start(&mut self) {
        let seed = self.session.seed().clone();
        tracing::info!("Starting crawl at {}", seed);
        self.request_get(&seed);
    }

    /// Runs a whole crawl: seed dispatch followed by the drain loop
    pub async fn run(&mut self) -> CrawlOutcome {
        let start_time = Instant::now();
        self.start();
        let outcome = self.drain().await;

        let max_visits = self.session.max_visits();
        tracing::info!(
            "Crawl {}: {} requests answered in {:?}, {} of {} visits used",
            match outcome {
                CrawlOutcome::Completed => "completed",
                CrawlOutcome::Interrupted => "interrupted",
            },
            self.completed,
            start_time.elapsed(),
            max_visits - self.session.remaining_visits(),
            max_visits
        );
        outcome
    }

    /// Processes events until nothing is outstanding
    ///
    /// Cancellation is checked before every event, so an interrupt is honored
    /// even while events keep arriving.
    pub async fn drain(&mut self) -> CrawlOutcome {
        if self.cancel.is_cancelled() {
            return CrawlOutcome::Interrupted;
        }

        while self.outstanding > 0 {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    tracing::warn!(
                        "Crawl interrupted with {} requests in flight, {} links unresolved",
                        self.outstanding,
                        self.session.pending_links()
                    );
                    return CrawlOutcome::Interrupted;
                }

                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::error!(
                            "Fetcher closed its event channel with {} requests outstanding",
                            self.outstanding
                        );
                        break;
                    }
                },
            }
        }

        CrawlOutcome::Completed
    }

    /// Applies a single fetch event to the session
    pub fn handle_event(&mut self, event: FetchEvent) {
        match event {
            FetchEvent::Anchor { page_url, href } => self.on_anchor(&page_url, &href),

            FetchEvent::Response {
                method,
                request_url,
                final_url,
                status,
                headers,
            } => {
                self.finish_request();
                tracing::debug!("{} {} -> {}", method, request_url, status);
                if method == RequestMethod::Get && final_url != request_url {
                    // Anything fetched at the final URL counts as its visit
                    self.session.claim_redirect(&final_url);
                }
                let resolution =
                    self.resolver
                        .on_response(&request_url, &final_url, status, &headers);
                self.apply(resolution);
            }

            FetchEvent::Error {
                method,
                request_url,
                status,
                kind,
                message,
            } => {
                self.finish_request();
                tracing::debug!("{} {} failed ({:?}): {}", method, request_url, kind, message);
                let resolution = self.resolver.on_error(&request_url, status, kind);
                self.apply(resolution);
            }
        }
    }

    fn finish_request(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.completed += 1;

        if self.completed % 50 == 0 {
            tracing::info!(
                "Progress: {} requests answered, {} in flight, {} visits left",
                self.completed,
                self.outstanding,
                self.session.remaining_visits()
            );
        }
    }

    fn on_anchor(&mut self, page_url: &Url, href: &str) {
        let Some(link) = resolve_link(href, page_url, self.session.link_policy()) else {
            tracing::debug!("Skipping unparseable link {:?} on {}", href, page_url);
            return;
        };

        if !is_fetchable(&link) {
            tracing::debug!("Skipping non-http link {} on {}", link, page_url);
            return;
        }

        self.session.record_edge(page_url, &link);
        self.request_get(&link);
    }

    fn apply(&mut self, resolution: Resolution) {
        for (url, status) in resolution.statuses {
            self.session.record_status(&url, status);
        }
        for target in resolution.head_checks {
            self.request_head(&target);
        }
    }

    fn request_get(&mut self, url: &Url) {
        if let GetRoute::Head(targets) = self.resolver.route_get(url) {
            tracing::debug!("{} is off-site, checking with HEAD", url);
            for target in targets {
                self.request_head(&target);
            }
            return;
        }

        match self.session.admit(RequestMethod::Get, url) {
            Admission::Admitted => match self.fetcher.visit(url) {
                Ok(()) => {
                    self.dispatched(url);
                    if let Some(secure) = https_variant(url) {
                        self.request_head(&secure);
                    }
                }
                Err(FetchError::ForbiddenDomain { .. }) => {
                    let resolution = self.resolver.on_refused(url);
                    self.apply(resolution);
                }
                Err(e) => tracing::warn!("Could not dispatch GET {}: {}", url, e),
            },
            Admission::BudgetExhausted => {
                tracing::debug!("Visit budget spent, not fetching {}", url);
            }
            Admission::Duplicate | Admission::NotFetchable => {}
        }
    }

    fn request_head(&mut self, url: &Url) {
        if !self.session.admit(RequestMethod::Head, url).is_admitted() {
            return;
        }

        match self.fetcher.head(url) {
            Ok(()) => self.dispatched(url),
            Err(e) => tracing::warn!("Could not dispatch HEAD {}: {}", url, e),
        }
    }

    fn dispatched(&mut self, url: &Url) {
        self.outstanding += 1;
        self.session.mark_dispatched(url);
    }
}
