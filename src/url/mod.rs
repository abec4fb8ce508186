//! URL handling module for Robocop
//!
//! Link resolution and normalization, `https` variant computation, and host
//! comparison used to keep full fetches on the crawled site.

mod domain;
mod normalize;

pub use domain::{extract_domain, host_with_port, is_disallowed, matches_domain_pattern, same_host};
pub use normalize::{
    https_variant, https_variant_str, is_fetchable, is_insecure, parse_absolute, resolve_link,
    LinkPolicy,
};

use url::Url;

/// Where a link points relative to the crawled host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same host (and explicit port) as the seed; eligible for a full GET
    Internal,
    /// Any other host; only checked with HEAD requests
    External,
}

impl LinkScope {
    /// Classifies `url` against the crawl's seed URL
    ///
    /// # Examples
    ///
    /// ```
    /// use robocop::url::LinkScope;
    /// use url::Url;
    ///
    /// let seed = Url::parse("https://site.com/").unwrap();
    /// let link = Url::parse("http://site.com/old").unwrap();
    /// assert_eq!(LinkScope::classify(&link, &seed), LinkScope::Internal);
    /// ```
    pub fn classify(url: &Url, seed: &Url) -> Self {
        if same_host(url, seed) {
            Self::Internal
        } else {
            Self::External
        }
    }

    /// Returns true if a full GET may be sent
    pub fn allows_get(&self) -> bool {
        matches!(self, Self::Internal)
    }
}
