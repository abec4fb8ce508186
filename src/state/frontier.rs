//! Visit frontier and dedup ledger
//!
//! Tracks every `(method, url)` pair admitted in this session and the number
//! of full page fetches still allowed. The frontier itself is not thread-safe;
//! `CrawlSession` keeps it behind its lock so the duplicate check and the
//! budget decrement happen in one critical section.

use crate::url::is_fetchable;
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// HTTP method of a dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    /// Full page fetch; consumes visit budget, body is parsed for anchors
    Get,
    /// Lightweight status check; exempt from the budget
    Head,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Head => f.write_str("HEAD"),
        }
    }
}

/// Outcome of asking the frontier to admit a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may be dispatched
    Admitted,
    /// The same method and URL were already admitted
    Duplicate,
    /// A GET was refused because the visit budget is spent
    BudgetExhausted,
    /// The scheme cannot be requested (`mailto:`, `javascript:` ...)
    NotFetchable,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Dedup ledger plus the GET visit budget
#[derive(Debug, Clone)]
pub struct VisitFrontier {
    seen: HashSet<(RequestMethod, String)>,
    remaining_visits: u32,
}

impl VisitFrontier {
    /// Creates an empty frontier allowing `max_visits` GETs
    pub fn new(max_visits: u32) -> Self {
        Self {
            seen: HashSet::new(),
            remaining_visits: max_visits,
        }
    }

    /// Admits a request if it is new, fetchable and (for GET) within budget
    ///
    /// A GET that is admitted consumes one unit of budget. Refused requests
    /// leave the ledger untouched, so a URL refused for budget stays
    /// undiscovered.
    pub fn admit(&mut self, method: RequestMethod, url: &Url) -> Admission {
        if !is_fetchable(url) {
            return Admission::NotFetchable;
        }

        let key = (method, url.as_str().to_string());
        if self.seen.contains(&key) {
            return Admission::Duplicate;
        }

        if method == RequestMethod::Get {
            if self.remaining_visits == 0 {
                return Admission::BudgetExhausted;
            }
            self.remaining_visits -= 1;
        }

        self.seen.insert(key);
        Admission::Admitted
    }

    /// Boolean form of [`admit`](Self::admit)
    pub fn should_visit(&mut self, method: RequestMethod, url: &Url) -> bool {
        self.admit(method, url).is_admitted()
    }

    /// Records a request made without admission, such as a followed redirect
    ///
    /// Takes no budget. Returns false if the pair was already known.
    pub fn mark_seen(&mut self, method: RequestMethod, url: &Url) -> bool {
        self.seen.insert((method, url.as_str().to_string()))
    }

    /// Returns true if this method and URL were already admitted
    pub fn contains(&self, method: RequestMethod, url: &str) -> bool {
        self.seen.contains(&(method, url.to_string()))
    }

    /// Returns true if any request for this URL was admitted
    pub fn is_known(&self, url: &str) -> bool {
        self.contains(RequestMethod::Get, url) || self.contains(RequestMethod::Head, url)
    }

    /// Number of GETs still allowed
    pub fn remaining_visits(&self) -> u32 {
        self.remaining_visits
    }

    /// Number of admitted requests
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
