//! Report renderer trait and errors

use crate::output::rows::ReportRow;
use thiserror::Error;

/// Column titles shared by every renderer
pub const REPORT_HEADER: [&str; 5] = ["Source Page", "Link", "Status", "SSL Link", "SSL Status"];

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error writing csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Something that turns report rows into output
///
/// Renderers hold no crawl logic; they format whatever rows they are given.
pub trait ReportRenderer {
    /// Writes the header and all rows
    fn render(&mut self, rows: &[ReportRow]) -> OutputResult<()>;
}
