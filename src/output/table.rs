//! Plain-text table for the terminal

use crate::output::rows::ReportRow;
use crate::output::traits::{OutputResult, ReportRenderer, REPORT_HEADER};
use std::io::Write;

/// Renders rows as an aligned, boxed text table
pub struct TableRenderer<W: Write> {
    out: W,
}

impl<W: Write> TableRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Gives back the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_separator(&mut self, widths: &[usize]) -> OutputResult<()> {
        let mut line = String::from("+");
        for width in widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    fn write_line(&mut self, cells: &[String], widths: &[usize]) -> OutputResult<()> {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(widths) {
            line.push_str(&format!(" {:<width$} |", cell, width = width));
        }
        writeln!(self.out, "{}", line)?;
        Ok(())
    }
}

impl<W: Write> ReportRenderer for TableRenderer<W> {
    fn render(&mut self, rows: &[ReportRow]) -> OutputResult<()> {
        let header: Vec<String> = REPORT_HEADER.iter().map(|h| h.to_uppercase()).collect();
        let body: Vec<[String; 5]> = rows.iter().map(ReportRow::fields).collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for fields in &body {
            for (width, field) in widths.iter_mut().zip(fields.iter()) {
                *width = (*width).max(field.chars().count());
            }
        }

        self.write_separator(&widths)?;
        self.write_line(&header, &widths)?;
        self.write_separator(&widths)?;
        for fields in &body {
            self.write_line(fields, &widths)?;
        }
        if !body.is_empty() {
            self.write_separator(&widths)?;
        }

        self.out.flush()?;
        Ok(())
    }
}
