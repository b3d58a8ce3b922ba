use crate::types::FlattenedRow;
use anyhow::{Context, Result};
use std::io::Write;

/// Writes a table as JSON Lines: an optional header row of column names, then one
/// JSON array per row
pub struct TableWriter<W: Write> {
    writer: W,
    rows_written: usize,
}

impl<W: Write> TableWriter<W> {
    pub fn new(writer: W) -> Self {
        TableWriter {
            writer,
            rows_written: 0,
        }
    }

    pub fn write_header(&mut self, headers: &[String]) -> Result<()> {
        let json = serde_json::to_string(headers).context("Failed to serialize header")?;
        writeln!(self.writer, "{}", json).context("Failed to write header")?;
        Ok(())
    }

    pub fn write_rows<I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = FlattenedRow>,
    {
        for row in rows {
            let json = serde_json::to_string(&row).context("Failed to serialize row")?;
            writeln!(self.writer, "{}", json).context("Failed to write row")?;
            self.rows_written += 1;
        }
        Ok(())
    }

    /// Rows written so far, the header excluded
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}
