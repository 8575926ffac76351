// src/sink.rs
//! Row destinations.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::schema::Row;

pub trait RowSink {
    /// Append rows in order. Either all rows are accepted or an error is returned.
    fn append(&mut self, rows: &[Row]) -> Result<usize>;

    fn name(&self) -> &str;
}

/// One JSON array per line, appended to a file.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for JsonlSink {
    fn append(&mut self, rows: &[Row]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        // serialize up front so a bad row cannot leave a partial batch
        let mut buf = Vec::new();
        for row in rows {
            serde_json::to_writer(&mut buf, row).context("serializing row")?;
            buf.push(b'\n');
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening sink {}", self.path.display()))?;
        let mut w = BufWriter::new(file);
        w.write_all(&buf)
            .with_context(|| format!("writing sink {}", self.path.display()))?;
        w.flush().context("flushing sink")?;
        Ok(rows.len())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// In-memory sink; can be told to fail.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<Row>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            rows: Vec::new(),
            fail: true,
        }
    }
}

impl RowSink for MemorySink {
    fn append(&mut self, rows: &[Row]) -> Result<usize> {
        if self.fail {
            return Err(anyhow!("memory sink configured to fail"));
        }
        self.rows.extend_from_slice(rows);
        Ok(rows.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
