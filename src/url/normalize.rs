use crate::url::domain::same_host;
use crate::{UrlError, UrlResult};
use url::Url;

/// Policy knobs for link normalization
#[derive(Debug, Clone, Copy)]
pub struct LinkPolicy {
    /// Drop query string and fragment from links that stay on the page's host.
    /// Keeps share/tracking variants of one page from multiplying the crawl.
    pub strip_same_host_query: bool,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            strip_same_host_query: true,
        }
    }
}

/// Resolves a raw `href` found on `page_url` into an absolute URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; empty hrefs yield nothing
/// 2. Resolve relative references against the page URL
/// 3. For links on the page's own host, drop query and fragment when the
///    policy asks for it; cross-host links are returned untouched
///
/// Unparseable input returns `None` so the caller can skip the link. Scheme
/// filtering (`mailto:` and friends) is left to [`is_fetchable`].
///
/// # Examples
///
/// ```
/// use robocop::url::{resolve_link, LinkPolicy};
/// use url::Url;
///
/// let page = Url::parse("https://site.com/blog/").unwrap();
/// let link = resolve_link("../about?ref=nav#team", &page, LinkPolicy::default()).unwrap();
/// assert_eq!(link.as_str(), "https://site.com/about");
/// ```
pub fn resolve_link(href: &str, page_url: &Url, policy: LinkPolicy) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = page_url.join(href).ok()?;

    if policy.strip_same_host_query && same_host(&resolved, page_url) {
        resolved.set_query(None);
        resolved.set_fragment(None);
    }

    Some(resolved)
}

/// Parses an absolute http(s) URL, used for the seed and for redirect targets
pub fn parse_absolute(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !is_fetchable(&url) {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Returns true for schemes the crawler can request (http and https)
pub fn is_fetchable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
}

/// Returns true when the link is a plain-text `http` URL
pub fn is_insecure(url: &Url) -> bool {
    url.scheme() == "http"
}

/// Computes the `https` variant of an `http` URL
///
/// Returns `None` for any other scheme. Explicit non-default ports are kept.
///
/// # Examples
///
/// ```
/// use robocop::url::https_variant;
/// use url::Url;
///
/// let link = Url::parse("http://site.com/x?y=1").unwrap();
/// assert_eq!(https_variant(&link).unwrap().as_str(), "https://site.com/x?y=1");
/// ```
pub fn https_variant(url: &Url) -> Option<Url> {
    if !is_insecure(url) {
        return None;
    }

    let mut secure = url.clone();
    secure.set_scheme("https").ok()?;
    Some(secure)
}

/// Same as [`https_variant`] but for a URL kept as a string in the ledgers
pub fn https_variant_str(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    https_variant(&parsed).map(String::from)
}
