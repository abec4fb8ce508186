//! CSV report output

use crate::output::rows::ReportRow;
use crate::output::traits::{OutputResult, ReportRenderer, REPORT_HEADER};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes rows as CSV with a header line
pub struct CsvRenderer<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(out),
        }
    }

    /// Flushes and gives back the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

impl<W: Write> ReportRenderer for CsvRenderer<W> {
    fn render(&mut self, rows: &[ReportRow]) -> OutputResult<()> {
        self.writer.write_record(REPORT_HEADER)?;
        for row in rows {
            self.writer.write_record(row.fields())?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes the CSV report to `path`, replacing any previous file
pub fn write_csv_file(path: &Path, rows: &[ReportRow]) -> OutputResult<()> {
    let file = File::create(path)?;
    CsvRenderer::new(file).render(rows)
}
