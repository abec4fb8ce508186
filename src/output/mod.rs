//! Output module for building and rendering the link report
//!
//! This module handles:
//! - Joining page links with recorded statuses into report rows
//! - Rendering rows as a terminal table
//! - Writing rows as CSV to stdout and to a report file

mod csv_output;
mod rows;
mod table;
mod traits;

pub use csv_output::{write_csv_file, CsvRenderer};
pub use rows::{finalize, ReportRow};
pub use table::TableRenderer;
pub use traits::{OutputError, OutputResult, ReportRenderer, REPORT_HEADER};

use crate::config::OutputConfig;
use std::io;
use std::path::Path;

/// Renders the report the way the command-line tool does
///
/// The table always goes to stdout. With CSV enabled the rows are also written
/// as CSV to stdout and to `config.csv_path`; failing to write that file is an
/// error because the user asked for it explicitly.
pub fn render_report(rows: &[ReportRow], config: &OutputConfig) -> OutputResult<()> {
    let stdout = io::stdout();

    TableRenderer::new(stdout.lock()).render(rows)?;

    if config.csv {
        CsvRenderer::new(stdout.lock()).render(rows)?;
        write_csv_file(Path::new(&config.csv_path), rows)?;
        tracing::info!("CSV report written to {}", config.csv_path);
    }

    Ok(())
}
