//! Status resolution rules
//!
//! Turns fetcher outcomes into ledger writes and follow-up HEAD checks. The
//! resolver is pure: the coordinator applies what it returns.

use crate::crawler::FetchErrorKind;
use crate::url::{https_variant, LinkScope};
use reqwest::header::{HeaderMap, LOCATION};
use url::Url;

/// How a discovered link should be requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetRoute {
    /// Same host as the seed: full GET
    Fetch,
    /// Another host: HEAD these URLs instead
    Head(Vec<Url>),
}

/// Ledger writes and HEAD checks produced by one fetcher outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub statuses: Vec<(String, u16)>,
    pub head_checks: Vec<Url>,
}

impl Resolution {
    fn record(&mut self, url: &Url, status: u16) {
        self.statuses.push((url.as_str().to_string(), status));
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.head_checks.is_empty()
    }
}

/// Decides status records and fallbacks relative to the crawled host
#[derive(Debug, Clone)]
pub struct StatusResolver {
    seed: Url,
}

impl StatusResolver {
    pub fn new(seed: Url) -> Self {
        Self { seed }
    }

    /// The URL itself plus, for `http`, its `https` variant
    fn probe_targets(url: &Url) -> Vec<Url> {
        let mut targets = vec![url.clone()];
        targets.extend(https_variant(url));
        targets
    }

    /// Routes a GET request for a discovered link
    ///
    /// Off-site links are never downloaded; they are checked with HEAD, and
    /// plain `http` ones are also probed over `https`.
    pub fn route_get(&self, url: &Url) -> GetRoute {
        if LinkScope::classify(url, &self.seed).allows_get() {
            GetRoute::Fetch
        } else {
            GetRoute::Head(Self::probe_targets(url))
        }
    }

    /// Handles a response of any status
    ///
    /// The status is recorded under the final URL and, after redirects, under
    /// the requested URL too. A 3xx that reached us (redirects not followed)
    /// queues a HEAD check of its `Location`.
    pub fn on_response(
        &self,
        request_url: &Url,
        final_url: &Url,
        status: u16,
        headers: &HeaderMap,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        resolution.record(final_url, status);
        if final_url != request_url {
            resolution.record(request_url, status);
        }

        if (300..=399).contains(&status) {
            let location = headers
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| request_url.join(value.trim()).ok());

            match location {
                Some(target) => resolution.head_checks.push(target),
                None => tracing::debug!("Redirect from {} without usable Location", request_url),
            }
        }

        resolution
    }

    /// Handles a failed request
    ///
    /// The carried status (0 for transport failures) is recorded. A forbidden
    /// domain is checked with HEAD instead.
    pub fn on_error(&self, request_url: &Url, status: u16, kind: FetchErrorKind) -> Resolution {
        if kind == FetchErrorKind::ForbiddenDomain {
            let mut resolution = self.on_refused(request_url);
            resolution.statuses.insert(0, (request_url.as_str().to_string(), status));
            return resolution;
        }

        let mut resolution = Resolution::default();
        resolution.record(request_url, status);
        resolution
    }

    /// Handles a GET the fetcher refused up front
    pub fn on_refused(&self, url: &Url) -> Resolution {
        tracing::debug!("GET refused for {}, falling back to HEAD", url);
        Resolution {
            statuses: Vec::new(),
            head_checks: Self::probe_targets(url),
        }
    }
}
