//! Data sources that supply raw entrant rows
//!
//! Retrieval and caching of race sessions happen outside this crate; a source
//! only hands over rows that are already collected.

use std::path::{Path, PathBuf};

use crate::data::raw::{MalformedRow, RawEntry};
use crate::{RaceformError, Result};

/// Rows read from a source, plus the records it could not decode
#[derive(Debug, Clone, Default)]
pub struct SourceRows {
    pub rows: Vec<RawEntry>,
    pub malformed: Vec<MalformedRow>,
}

/// Trait for all entrant-row sources
pub trait EntrySource {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// Load every available row, in arrival order.
    ///
    /// An undecodable record is reported in `malformed`; it does not fail the load.
    fn load(&self) -> Result<SourceRows>;
}

/// Reads the results dataset CSV written by the external collector
pub struct CsvEntrySource {
    path: PathBuf,
}

impl CsvEntrySource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvEntrySource {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parse rows from any reader (header row required).
    ///
    /// Undecodable records are set aside per row; only an I/O failure of the
    /// reader itself fails the call.
    pub fn read_from<R: std::io::Read>(reader: R) -> Result<SourceRows> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut batch = SourceRows::default();
        for (i, record) in csv_reader.deserialize::<RawEntry>().enumerate() {
            // Header is line 1
            let line = i + 2;
            match record {
                Ok(mut row) => {
                    row.line = line;
                    batch.rows.push(row);
                }
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    log::warn!("Unreadable record at line {}: {}", line, e);
                    batch.malformed.push(MalformedRow {
                        line,
                        reason: format!("unreadable record: {}", e),
                    });
                }
            }
        }
        Ok(batch)
    }
}

impl EntrySource for CsvEntrySource {
    fn describe(&self) -> String {
        format!("CSV dataset {}", self.path.display())
    }

    fn load(&self) -> Result<SourceRows> {
        if !self.path.exists() {
            return Err(RaceformError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset not found: {}", self.path.display()),
            )));
        }
        let file = std::fs::File::open(&self.path)?;
        let batch = Self::read_from(file)?;
        log::info!(
            "Read {} rows from {} ({} unreadable)",
            batch.rows.len(),
            self.describe(),
            batch.malformed.len()
        );
        Ok(batch)
    }
}

/// Rows already held in memory (tests, embedding callers)
pub struct MemorySource {
    rows: Vec<RawEntry>,
}

impl MemorySource {
    pub fn new(rows: Vec<RawEntry>) -> Self {
        MemorySource { rows }
    }
}

impl EntrySource for MemorySource {
    fn describe(&self) -> String {
        format!("{} in-memory rows", self.rows.len())
    }

    fn load(&self) -> Result<SourceRows> {
        Ok(SourceRows {
            rows: self.rows.clone(),
            malformed: Vec::new(),
        })
    }
}
