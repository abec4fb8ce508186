//! The crawl session aggregate
//!
//! All state shared between the event loop and the interrupt path lives in one
//! `SessionState` behind one mutex. Callers never see the raw containers; they
//! go through `admit`, `record_status`, `record_edge`, `snapshot` and
//! `finalize`, each of which is a single critical section.

use crate::config::Config;
use crate::output::{finalize, ReportRow};
use crate::state::frontier::{Admission, RequestMethod, VisitFrontier};
use crate::state::link_state::LinkState;
use crate::url::LinkPolicy;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// Status code placeholder for links with no answer yet
pub const UNRESOLVED: u16 = 0;

/// Source page URL → links found on that page
pub type PageLinkSet = BTreeMap<String, BTreeSet<String>>;

/// URL → last recorded HTTP status code
pub type StatusLedger = HashMap<String, u16>;

/// Owned copy of the session's report inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub page_links: PageLinkSet,
    pub statuses: StatusLedger,
    pub remaining_visits: u32,
}

impl SessionSnapshot {
    /// Builds report rows from this snapshot
    pub fn report(&self, only_failures: bool) -> Vec<ReportRow> {
        finalize(&self.page_links, &self.statuses, only_failures)
    }

    /// Number of (source page, link) edges
    pub fn edge_count(&self) -> usize {
        self.page_links.values().map(BTreeSet::len).sum()
    }
}

#[derive(Debug)]
struct SessionState {
    frontier: VisitFrontier,
    page_links: PageLinkSet,
    statuses: StatusLedger,
    link_states: HashMap<String, LinkState>,
    finalized: bool,
}

impl SessionState {
    fn advance(&mut self, url: &str, next: LinkState) {
        let current = self
            .link_states
            .get(url)
            .copied()
            .unwrap_or(LinkState::Undiscovered);

        if current.can_transition_to(next) {
            self.link_states.insert(url.to_string(), next);
        } else {
            tracing::trace!("Ignoring {} -> {} for {}", current, next, url);
        }
    }
}

/// Shared crawl state: page links, statuses, dedup ledger and visit budget
///
/// Created once per crawl. Mutated by the coordinator while events arrive and
/// read by whoever finalizes. After `finalize` the session is read-only and
/// further mutations are ignored.
#[derive(Debug)]
pub struct CrawlSession {
    seed: Url,
    max_visits: u32,
    only_failures: bool,
    policy: LinkPolicy,
    state: Mutex<SessionState>,
}

impl CrawlSession {
    /// Creates a session for the given seed URL
    pub fn new(seed: Url, max_visits: u32, only_failures: bool, policy: LinkPolicy) -> Self {
        Self {
            seed,
            max_visits,
            only_failures,
            policy,
            state: Mutex::new(SessionState {
                frontier: VisitFrontier::new(max_visits),
                page_links: PageLinkSet::new(),
                statuses: StatusLedger::new(),
                link_states: HashMap::new(),
                finalized: false,
            }),
        }
    }

    /// Creates a session from the crawler configuration
    pub fn from_config(seed: Url, config: &Config) -> Self {
        Self::new(
            seed,
            config.crawler.max_visits,
            config.output.only_failures,
            LinkPolicy {
                strip_same_host_query: config.crawler.strip_same_host_query,
            },
        )
    }

    // A panic while holding the lock must not prevent the partial report.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The seed URL; its host is the only one fetched with GET
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn max_visits(&self) -> u32 {
        self.max_visits
    }

    pub fn only_failures(&self) -> bool {
        self.only_failures
    }

    pub fn link_policy(&self) -> LinkPolicy {
        self.policy
    }

    /// Admits a request through the frontier and marks the URL queued
    ///
    /// Dedup check and budget decrement happen under one lock acquisition, so
    /// two concurrent admissions of one URL cannot both succeed and the budget
    /// cannot go negative.
    pub fn admit(&self, method: RequestMethod, url: &Url) -> Admission {
        let mut state = self.lock();
        if state.finalized {
            return Admission::Duplicate;
        }

        let admission = state.frontier.admit(method, url);
        if admission.is_admitted() {
            state.advance(url.as_str(), LinkState::Queued);
        }
        admission
    }

    /// Claims the target of a followed redirect for GET
    ///
    /// Returns false if a GET for it was already admitted or claimed, in which
    /// case the redirect must not be followed. No budget is taken: the request
    /// that led here already paid for it.
    pub fn claim_redirect(&self, url: &Url) -> bool {
        let mut state = self.lock();
        if state.finalized {
            return false;
        }

        let claimed = state.frontier.mark_seen(RequestMethod::Get, url);
        if claimed {
            state.advance(url.as_str(), LinkState::Queued);
        }
        claimed
    }

    /// Number of URLs queued or waiting for an answer
    pub fn pending_links(&self) -> usize {
        self.lock()
            .link_states
            .values()
            .filter(|state| state.is_active())
            .count()
    }

    /// Marks a URL as handed to the fetcher
    pub fn mark_dispatched(&self, url: &Url) {
        let mut state = self.lock();
        if !state.finalized {
            state.advance(url.as_str(), LinkState::Resolving);
        }
    }

    /// Records a status code for a URL (last write wins)
    ///
    /// Recording [`UNRESOLVED`] keeps the URL out of the `Resolved` state.
    pub fn record_status(&self, url: &str, status: u16) {
        let mut state = self.lock();
        if state.finalized {
            tracing::trace!("Session finalized, dropping status {} for {}", status, url);
            return;
        }

        state.statuses.insert(url.to_string(), status);
        if status != UNRESOLVED {
            state.advance(url, LinkState::Resolved);
        }
    }

    /// Records that `link` was found on `page`
    pub fn record_edge(&self, page: &Url, link: &Url) {
        let mut state = self.lock();
        if state.finalized {
            return;
        }

        state
            .page_links
            .entry(page.as_str().to_string())
            .or_default()
            .insert(link.as_str().to_string());
    }

    /// Returns the last recorded status, if any
    pub fn status_of(&self, url: &str) -> Option<u16> {
        self.lock().statuses.get(url).copied()
    }

    /// Returns the lifecycle state of a URL
    pub fn link_state(&self, url: &str) -> LinkState {
        self.lock()
            .link_states
            .get(url)
            .copied()
            .unwrap_or(LinkState::Undiscovered)
    }

    /// Number of GETs still allowed
    pub fn remaining_visits(&self) -> u32 {
        self.lock().frontier.remaining_visits()
    }

    /// Copies the report inputs under the lock
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            page_links: state.page_links.clone(),
            statuses: state.statuses.clone(),
            remaining_visits: state.frontier.remaining_visits(),
        }
    }

    /// Returns true once `finalize` has run
    pub fn is_finalized(&self) -> bool {
        self.lock().finalized
    }

    /// Freezes the session and builds the report
    ///
    /// Only the first caller gets rows; later calls return `None`, so the
    /// report is rendered exactly once even when an interrupt races normal
    /// completion.
    pub fn finalize(&self) -> Option<Vec<ReportRow>> {
        let mut state = self.lock();
        if state.finalized {
            return None;
        }
        state.finalized = true;

        let rows = finalize(&state.page_links, &state.statuses, self.only_failures);
        tracing::debug!(
            "Finalized session: {} pages, {} statuses, {} report rows",
            state.page_links.len(),
            state.statuses.len(),
            rows.len()
        );
        Some(rows)
    }
}
