//! HTML anchor extraction
//!
//! Only `<a href>` anchors are audited. Hrefs are returned raw; resolving them
//! against the page URL is the URL normalizer's job.

use scraper::{Html, Selector};

/// Extracts the raw `href` value of every anchor in the document
///
/// Empty hrefs and same-page fragment links (`#section`) are dropped. Scheme
/// filtering happens later, so `mailto:` hrefs are still returned here.
///
/// # Example
///
/// ```
/// use robocop::crawler::extract_anchors;
///
/// let html = r#"<html><body><a href="/page">Link</a><a href="">Empty</a></body></html>"#;
/// assert_eq!(extract_anchors(html), vec!["/page".to_string()]);
/// ```
pub fn extract_anchors(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Returns true if a Content-Type header value denotes an HTML document
pub fn is_html(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}
