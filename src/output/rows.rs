//! Report aggregation: page links joined with statuses
//!
//! ```text
//! source page | link | link status | https link (for http links) | https status
//! ```

use crate::state::{PageLinkSet, StatusLedger, UNRESOLVED};
use crate::url::https_variant_str;

/// Status code of a healthy link
const OK: u16 = 200;

/// One line of the link report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Page the link was found on
    pub source_page: String,
    /// The link as recorded (absolute)
    pub link: String,
    /// Status recorded for the link
    pub link_status: u16,
    /// `https` variant of the link, only for `http` links
    pub ssl_link: Option<String>,
    /// Status of the `https` variant, absent while unresolved
    pub ssl_status: Option<u16>,
}

impl ReportRow {
    /// The five rendered fields; missing values become empty strings
    pub fn fields(&self) -> [String; 5] {
        [
            self.source_page.clone(),
            self.link.clone(),
            self.link_status.to_string(),
            self.ssl_link.clone().unwrap_or_default(),
            self.ssl_status.map(|s| s.to_string()).unwrap_or_default(),
        ]
    }
}

/// Builds the report rows from page links and statuses
///
/// For every (source page, link) edge:
///
/// - links answering 200 are skipped
/// - links still unresolved (status 0 or never recorded) are skipped, so a
///   report taken mid-crawl only shows edges that have a real answer
/// - `http` links get their `https` variant and its status; an unresolved
///   variant leaves the SSL status empty
/// - with `only_failures`, `http` links whose `https` variant answers 200 are
///   skipped
///
/// The result is ordered by source page then link, and depends only on the
/// inputs.
pub fn finalize(
    page_links: &PageLinkSet,
    statuses: &StatusLedger,
    only_failures: bool,
) -> Vec<ReportRow> {
    let mut rows = Vec::new();

    for (source_page, links) in page_links {
        for link in links {
            let link_status = statuses.get(link).copied().unwrap_or(UNRESOLVED);
            if link_status == OK || link_status == UNRESOLVED {
                continue;
            }

            let ssl_link = https_variant_str(link);
            let ssl_status = ssl_link
                .as_ref()
                .and_then(|secure| statuses.get(secure).copied())
                .filter(|status| *status != UNRESOLVED);

            if only_failures && ssl_status == Some(OK) {
                continue;
            }

            rows.push(ReportRow {
                source_page: source_page.clone(),
                link: link.clone(),
                link_status,
                ssl_link,
                ssl_status,
            });
        }
    }

    rows
}
