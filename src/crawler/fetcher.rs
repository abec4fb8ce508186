//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests restricted to the crawled host, parsed for anchors
//! - HEAD requests for status checks on any host
//! - Refusing redirects into disallowed domains
//! - Error classification
//!
//! Requests run on spawned tasks. Results come back to the coordinator as
//! [`FetchEvent`]s over an unbounded channel; a page's anchor events are always
//! sent before its terminal `Response` or `Error` event.

use crate::config::Config;
use crate::crawler::cache::{CachedResponse, ResponseCache};
use crate::crawler::limiter::HostLimiter;
use crate::crawler::parser::{extract_anchors, is_html};
use crate::state::{CrawlSession, RequestMethod};
use crate::url::{is_disallowed, is_fetchable, same_host};
use chrono::Utc;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{redirect, Client, Response};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// Errors returned synchronously when dispatching a request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Forbidden domain: {url}")]
    ForbiddenDomain { url: String },

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Event channel closed")]
    Closed,
}

/// Why a dispatched request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Target or redirect target is outside the allowed domains
    ForbiddenDomain,
    Timeout,
    /// DNS, connect or TLS failure
    Connection,
    /// Redirect loop or too many hops
    Redirect,
    Other,
}

/// Outcome notifications sent from the fetcher to the coordinator
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// An `<a href>` found on a fetched page
    Anchor { page_url: Url, href: String },

    /// A response of any status (4xx/5xx included)
    Response {
        method: RequestMethod,
        request_url: Url,
        final_url: Url,
        status: u16,
        headers: HeaderMap,
    },

    /// The request failed without a usable response
    Error {
        method: RequestMethod,
        request_url: Url,
        status: u16,
        kind: FetchErrorKind,
        message: String,
    },
}

impl FetchEvent {
    /// Returns true for events that close out one dispatched request
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Anchor { .. })
    }
}

/// Asynchronous page fetcher driven by the coordinator
///
/// Both methods return as soon as the request is dispatched. Exactly one
/// terminal event follows every `Ok(())`.
pub trait PageFetcher: Send + Sync {
    /// Full GET; may refuse with [`FetchError::ForbiddenDomain`]
    fn visit(&self, url: &Url) -> Result<(), FetchError>;

    /// HEAD status check; never domain-restricted
    fn head(&self, url: &Url) -> Result<(), FetchError>;
}

/// Shared record of fetched pages, consulted before following a redirect
pub trait RedirectGuard: Send + Sync {
    /// Returns true if the redirect target may be fetched; claiming it keeps
    /// the page from being fetched again later
    fn claim(&self, url: &Url) -> bool;
}

impl RedirectGuard for CrawlSession {
    fn claim(&self, url: &Url) -> bool {
        self.claim_redirect(url)
    }
}

/// Redirect target rejected by the GET client's redirect policy
#[derive(Debug, Error)]
#[error("redirect into forbidden domain: {0}")]
struct ForbiddenRedirect(String);

#[derive(Debug, Clone)]
struct DomainRules {
    seed: Url,
    disallowed: Vec<String>,
}

impl DomainRules {
    fn allows_get(&self, url: &Url) -> bool {
        same_host(url, &self.seed) && !is_disallowed(url, &self.disallowed)
    }
}

/// Builds the HTTP clients used by [`HttpFetcher`]
///
/// Returns `(get_client, head_client)`. The GET client refuses redirects that
/// leave the crawled host or enter a disallowed domain, and stops at targets
/// the guard has already seen (the 3xx is then returned as the response). The
/// HEAD client follows any redirect.
pub fn build_http_clients(
    seed: &Url,
    config: &Config,
    guard: Option<Arc<dyn RedirectGuard>>,
) -> Result<(Client, Client), reqwest::Error> {
    let user_agent = config.user_agent.header_value();
    let timeout = Duration::from_secs(config.crawler.request_timeout);

    let (get_policy, head_policy) = if config.crawler.follow_redirects {
        let seed = seed.clone();
        let disallowed = config.crawler.disallowed_domains.clone();
        let get_policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            let target = attempt.url();
            if !same_host(target, &seed) || is_disallowed(target, &disallowed) {
                let url = target.to_string();
                return attempt.error(ForbiddenRedirect(url));
            }
            if let Some(guard) = &guard {
                if !guard.claim(target) {
                    tracing::debug!("Not following redirect to already visited {}", target);
                    return attempt.stop();
                }
            }
            attempt.follow()
        });
        (get_policy, redirect::Policy::limited(MAX_REDIRECTS))
    } else {
        (redirect::Policy::none(), redirect::Policy::none())
    };

    let build = |policy: redirect::Policy| {
        Client::builder()
            .user_agent(user_agent.clone())
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(policy)
            .gzip(true)
            .brotli(true)
            .build()
    };

    Ok((build(get_policy)?, build(head_policy)?))
}

/// Classifies a reqwest error into a [`FetchErrorKind`]
fn classify_error(error: &reqwest::Error) -> FetchErrorKind {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(inner) = source {
        if inner.downcast_ref::<ForbiddenRedirect>().is_some() {
            return FetchErrorKind::ForbiddenDomain;
        }
        source = inner.source();
    }

    if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if error.is_connect() {
        FetchErrorKind::Connection
    } else if error.is_redirect() {
        FetchErrorKind::Redirect
    } else {
        FetchErrorKind::Other
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

struct Inner {
    rules: DomainRules,
    get_client: Client,
    head_client: Client,
    limiter: HostLimiter,
    cache: Option<ResponseCache>,
    guard: Option<Arc<dyn RedirectGuard>>,
    events: UnboundedSender<FetchEvent>,
}

impl Inner {
    fn send(&self, event: FetchEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Coordinator gone, dropping fetch event");
        }
    }

    fn send_anchors(&self, page_url: &Url, body: &str) {
        for href in extract_anchors(body) {
            self.send(FetchEvent::Anchor {
                page_url: page_url.clone(),
                href,
            });
        }
    }

    fn send_error(&self, method: RequestMethod, url: &Url, error: &reqwest::Error) {
        let kind = classify_error(error);
        tracing::debug!("{} {} failed ({:?}): {}", method, url, kind, error);
        self.send(FetchEvent::Error {
            method,
            request_url: url.clone(),
            status: error.status().map(|s| s.as_u16()).unwrap_or(0),
            kind,
            message: error.to_string(),
        });
    }

    async fn get(&self, url: Url) {
        if let Some(entry) = self.cache.as_ref().and_then(|cache| cache.load(&url)) {
            tracing::debug!("Cache hit for {}", url);
            self.replay(url, entry);
            return;
        }

        let _permit = self.limiter.acquire(&url).await;
        tracing::debug!("GET {}", url);

        match self.get_client.get(url.clone()).send().await {
            Ok(response) => self.finish_get(url, response).await,
            Err(e) => self.send_error(RequestMethod::Get, &url, &e),
        }
    }

    async fn finish_get(&self, url: Url, response: Response) {
        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let content_type = content_type(&headers);

        let body = if status.is_success() && is_html(content_type.as_deref()) {
            match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    self.send_error(RequestMethod::Get, &url, &e);
                    return;
                }
            }
        } else {
            String::new()
        };

        self.send_anchors(&final_url, &body);

        if let Some(cache) = &self.cache {
            if ResponseCache::is_cacheable(status.as_u16()) {
                let entry = CachedResponse {
                    url: url.to_string(),
                    final_url: final_url.to_string(),
                    status: status.as_u16(),
                    content_type,
                    body,
                    fetched_at: Utc::now(),
                };
                if let Err(e) = cache.store(&entry) {
                    tracing::warn!("Failed to cache {}: {}", url, e);
                }
            }
        }

        self.send(FetchEvent::Response {
            method: RequestMethod::Get,
            request_url: url,
            final_url,
            status: status.as_u16(),
            headers,
        });
    }

    fn replay(&self, url: Url, entry: CachedResponse) {
        let final_url = Url::parse(&entry.final_url).unwrap_or_else(|_| url.clone());

        // A cached redirect replays like a live one: skip the page if it was
        // already fetched on its own
        let claimed = final_url == url
            || self.guard.as_ref().map_or(true, |guard| guard.claim(&final_url));

        let is_page =
            (200..300).contains(&entry.status) && is_html(entry.content_type.as_deref());
        if claimed && is_page {
            self.send_anchors(&final_url, &entry.body);
        }

        self.send(FetchEvent::Response {
            method: RequestMethod::Get,
            request_url: url,
            final_url,
            status: entry.status,
            headers: HeaderMap::new(),
        });
    }

    async fn head(&self, url: Url) {
        let _permit = self.limiter.acquire(&url).await;
        tracing::debug!("HEAD {}", url);

        match self.head_client.head(url.clone()).send().await {
            Ok(response) => self.send(FetchEvent::Response {
                method: RequestMethod::Head,
                final_url: response.url().clone(),
                request_url: url,
                status: response.status().as_u16(),
                headers: response.headers().clone(),
            }),
            Err(e) => self.send_error(RequestMethod::Head, &url, &e),
        }
    }
}

/// reqwest-backed [`PageFetcher`]
///
/// Must be used from within a tokio runtime; every request is a spawned task.
#[derive(Clone)]
pub struct HttpFetcher {
    inner: Arc<Inner>,
}

impl HttpFetcher {
    /// Creates a fetcher for the crawl described by `config`
    ///
    /// A cache directory that cannot be created is logged and the crawl runs
    /// without a cache. Redirect targets are claimed through `guard` so a page
    /// reached by redirect is not fetched a second time.
    pub fn new(
        seed: Url,
        config: &Config,
        guard: Option<Arc<dyn RedirectGuard>>,
        events: UnboundedSender<FetchEvent>,
    ) -> Result<Self, reqwest::Error> {
        let (get_client, head_client) = build_http_clients(&seed, config, guard.clone())?;

        let cache = if config.crawler.no_cache {
            None
        } else {
            match ResponseCache::open(&config.crawler.cache_dir) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    tracing::warn!(
                        "Cannot use cache directory {}: {}; continuing without cache",
                        config.crawler.cache_dir,
                        e
                    );
                    None
                }
            }
        };

        Ok(Self {
            inner: Arc::new(Inner {
                rules: DomainRules {
                    seed,
                    disallowed: config.crawler.disallowed_domains.clone(),
                },
                get_client,
                head_client,
                limiter: HostLimiter::new(
                    config.crawler.parallelism,
                    Duration::from_secs(config.crawler.random_delay),
                ),
                cache,
                guard,
                events,
            }),
        })
    }

    fn check_dispatch(&self, url: &Url) -> Result<(), FetchError> {
        if !is_fetchable(url) {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }
        if self.inner.events.is_closed() {
            return Err(FetchError::Closed);
        }
        Ok(())
    }
}

impl PageFetcher for HttpFetcher {
    fn visit(&self, url: &Url) -> Result<(), FetchError> {
        self.check_dispatch(url)?;
        if !self.inner.rules.allows_get(url) {
            return Err(FetchError::ForbiddenDomain {
                url: url.to_string(),
            });
        }

        let inner = Arc::clone(&self.inner);
        let url = url.clone();
        tokio::spawn(async move { inner.get(url).await });
        Ok(())
    }

    fn head(&self, url: &Url) -> Result<(), FetchError> {
        self.check_dispatch(url)?;

        let inner = Arc::clone(&self.inner);
        let url = url.clone();
        tokio::spawn(async move { inner.head(url).await });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.crawler.host = "https://site.com/".to_string();
        config.crawler.no_cache = true;
        config.crawler.random_delay = 0;
        config
    }

    fn fetcher(config: &Config) -> (HttpFetcher, mpsc::UnboundedReceiver<FetchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let seed = Url::parse(&config.crawler.host).unwrap();
        (HttpFetcher::new(seed, config, None, tx).unwrap(), rx)
    }

    #[test]
    fn test_build_http_clients() {
        let seed = Url::parse("https://site.com/").unwrap();
        assert!(build_http_clients(&seed, &test_config(), None).is_ok());

        let mut config = test_config();
        config.crawler.follow_redirects = false;
        assert!(build_http_clients(&seed, &config, None).is_ok());
    }

    #[test]
    fn test_domain_rules() {
        let rules = DomainRules {
            seed: Url::parse("https://site.com/").unwrap(),
            disallowed: vec!["*.facebook.com".to_string()],
        };
        assert!(rules.allows_get(&Url::parse("http://site.com/a").unwrap()));
        assert!(!rules.allows_get(&Url::parse("https://other.com/").unwrap()));
        assert!(!rules.allows_get(&Url::parse("https://www.facebook.com/").unwrap()));
    }

    #[tokio::test]
    async fn test_visit_refuses_other_host() {
        let (fetcher, _rx) = fetcher(&test_config());
        let result = fetcher.visit(&Url::parse("https://other.com/").unwrap());
        assert!(matches!(result, Err(FetchError::ForbiddenDomain { .. })));
    }

    #[tokio::test]
    async fn test_visit_refuses_disallowed_seed_domain() {
        let mut config = test_config();
        config.crawler.host = "https://m.facebook.com/".to_string();
        let (fetcher, _rx) = fetcher(&config);
        let result = fetcher.visit(&Url::parse("https://m.facebook.com/page").unwrap());
        assert!(matches!(result, Err(FetchError::ForbiddenDomain { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let (fetcher, _rx) = fetcher(&test_config());
        let result = fetcher.head(&Url::parse("mailto:c@x.com").unwrap());
        assert!(matches!(result, Err(FetchError::UnsupportedScheme(_))));
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (fetcher, rx) = fetcher(&test_config());
        drop(rx);
        let result = fetcher.head(&Url::parse("https://other.com/").unwrap());
        assert!(matches!(result, Err(FetchError::Closed)));
    }

    #[tokio::test]
    async fn test_cache_replay_emits_anchors_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = test_config();
        config.crawler.no_cache = false;
        config.crawler.cache_dir = dir.path().to_string_lossy().into_owned();

        let page = Url::parse("https://site.com/").unwrap();
        ResponseCache::open(dir.path())
            .unwrap()
            .store(&CachedResponse {
                url: page.to_string(),
                final_url: page.to_string(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body: r#"<a href="/a">a</a><a href="/b">b</a>"#.to_string(),
                fetched_at: Utc::now(),
            })
            .unwrap();

        let (fetcher, mut rx) = fetcher(&config);
        fetcher.visit(&page).unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], FetchEvent::Anchor { href, .. } if href == "/a"));
        assert!(matches!(&events[1], FetchEvent::Anchor { href, .. } if href == "/b"));
        assert!(matches!(
            &events[2],
            FetchEvent::Response { status: 200, method: RequestMethod::Get, .. }
        ));
    }

    #[tokio::test]
    async fn test_cache_replay_skips_already_fetched_redirect_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = test_config();
        config.crawler.no_cache = false;
        config.crawler.cache_dir = dir.path().to_string_lossy().into_owned();

        let old = Url::parse("https://site.com/old").unwrap();
        let new = Url::parse("https://site.com/new").unwrap();
        ResponseCache::open(dir.path())
            .unwrap()
            .store(&CachedResponse {
                url: old.to_string(),
                final_url: new.to_string(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body: r#"<a href="/a">a</a>"#.to_string(),
                fetched_at: Utc::now(),
            })
            .unwrap();

        let session = Arc::new(CrawlSession::new(
            Url::parse("https://site.com/").unwrap(),
            10,
            false,
            crate::url::LinkPolicy::default(),
        ));
        assert!(session.admit(RequestMethod::Get, &new).is_admitted());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard: Arc<dyn RedirectGuard> = session.clone();
        let fetcher = HttpFetcher::new(
            Url::parse("https://site.com/").unwrap(),
            &config,
            Some(guard),
            tx,
        )
        .unwrap();
        fetcher.visit(&old).unwrap();

        // Only the terminal event: the page's anchors belong to the direct fetch
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            FetchEvent::Response { status: 200, ref final_url, .. } if *final_url == new
        ));
    }

    #[test]
    fn test_event_is_terminal() {
        let url = Url::parse("https://site.com/").unwrap();
        let anchor = FetchEvent::Anchor {
            page_url: url.clone(),
            href: "/a".to_string(),
        };
        let error = FetchEvent::Error {
            method: RequestMethod::Head,
            request_url: url,
            status: 0,
            kind: FetchErrorKind::Timeout,
            message: "timed out".to_string(),
        };
        assert!(!anchor.is_terminal());
        assert!(error.is_terminal());
    }
}
