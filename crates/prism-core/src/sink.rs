//! Result formatting for CSV and JSONL sinks.
//!
//! The output collaborator. The core hands over results with colors already
//! ranked, capped, and hex-encoded; everything visual (the `#` marker, the
//! fixed column width) happens here.

use std::io::{self, Write};

use crate::error::ConfigError;
use crate::types::ResultItem;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One CSV row per result with a fixed number of color columns
    Csv,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// A writer that serializes results in arrival order.
#[derive(Debug)]
pub struct ResultWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    columns: usize,
    items_written: usize,
}

impl<W: Write> ResultWriter<W> {
    /// Create a new result writer.
    ///
    /// `columns` fixes the color-column count of CSV rows: rows with fewer
    /// colors are padded with empty cells so every row has the same width,
    /// and surplus colors are not written. It must be at least 1, a usage
    /// error caught at construction, like the pipeline's own bounds.
    pub fn new(writer: W, format: OutputFormat, columns: usize) -> Result<Self, ConfigError> {
        if columns == 0 {
            return Err(ConfigError::Validation(
                "output column count must be > 0".into(),
            ));
        }
        Ok(Self {
            writer,
            format,
            columns,
            items_written: 0,
        })
    }

    /// Write a single result.
    pub fn write(&mut self, result: &ResultItem) -> io::Result<()> {
        match self.format {
            OutputFormat::Csv => {
                let mut line = String::with_capacity(result.name.len() + self.columns * 8 + 2);
                line.push_str(&result.name);
                line.push(',');
                for color in result.colors.iter().take(self.columns) {
                    line.push('#');
                    line.push_str(&color.hex);
                    line.push(',');
                }
                for _ in result.colors.len()..self.columns {
                    line.push(',');
                }
                writeln!(self.writer, "{line}")?;
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, result).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Number of results written so far.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
