use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host, or None for URLs without one (`mailto:` etc).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use robocop::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the host plus any non-default port, e.g. `example.com` or `127.0.0.1:8080`
///
/// Default ports are omitted, so `http://site.com/` and `https://site.com/`
/// share the same authority.
pub fn host_with_port(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Returns true when both URLs point at the same host (and explicit port)
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (host_with_port(a), host_with_port(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Checks a domain against a pattern from the disallowed-domain list
///
/// `example.com` only matches itself; `*.example.com` matches the bare domain
/// and any subdomain.
pub fn matches_domain_pattern(pattern: &str, domain: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            domain == base
                || domain
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => domain == pattern,
    }
}

/// Returns true if the URL's domain matches any of the given patterns
pub fn is_disallowed(url: &Url, patterns: &[String]) -> bool {
    match extract_domain(url) {
        Some(domain) => patterns
            .iter()
            .any(|pattern| matches_domain_pattern(pattern, &domain)),
        None => false,
    }
}
