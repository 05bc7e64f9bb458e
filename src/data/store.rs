//! Entry Store: the canonical, typed set of race entries
//!
//! Entries are admitted through [`EntryStore::ingest`] and never mutated in
//! place by callers. Keys are (year, round, driver); re-ingesting a stored key
//! replaces the prior entry at its original position.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::data::raw::{MalformedRow, RawEntry};
use crate::{EntryKey, RaceEntry};

/// Outcome of one ingestion batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// New keys added to the store
    pub admitted: usize,
    /// Stored keys overwritten by this batch
    pub replaced: usize,
    /// Repeats of a key already seen earlier in the same batch
    pub duplicates_skipped: usize,
    /// Rows dropped because an identifying field was unusable
    pub malformed: Vec<MalformedRow>,
}

impl IngestReport {
    pub fn accepted(&self) -> usize {
        self.admitted + self.replaced
    }
}

/// In-memory store of race entries in arrival order
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    entries: Vec<RaceEntry>,
    index: HashMap<EntryKey, usize>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a single batch of raw rows
    pub fn from_raw(rows: impl IntoIterator<Item = RawEntry>) -> (Self, IngestReport) {
        let mut store = Self::new();
        let report = store.ingest(rows);
        (store, report)
    }

    /// Coerce and upsert a batch of raw rows.
    ///
    /// Within a batch the first row for a key wins; later duplicates are
    /// skipped. Across batches the newer row replaces the stored one.
    pub fn ingest(&mut self, rows: impl IntoIterator<Item = RawEntry>) -> IngestReport {
        let mut report = IngestReport::default();
        let mut seen_in_batch = HashSet::new();

        for row in rows {
            let entry = match row.normalize() {
                Ok(entry) => entry,
                Err(malformed) => {
                    log::warn!(
                        "Dropping row at line {}: {}",
                        malformed.line,
                        malformed.reason
                    );
                    report.malformed.push(malformed);
                    continue;
                }
            };

            let key = entry.key();
            if !seen_in_batch.insert(key.clone()) {
                log::debug!("Skipping duplicate row for {}", key);
                report.duplicates_skipped += 1;
                continue;
            }

            if self.upsert(entry) {
                report.replaced += 1;
            } else {
                report.admitted += 1;
            }
        }

        log::info!(
            "Ingested {} rows ({} new, {} replaced, {} duplicates, {} malformed)",
            report.accepted(),
            report.admitted,
            report.replaced,
            report.duplicates_skipped,
            report.malformed.len()
        );
        report
    }

    /// Insert or replace an already-typed entry. Returns true if it replaced one.
    pub fn upsert(&mut self, entry: RaceEntry) -> bool {
        let key = entry.key();
        match self.index.get(&key) {
            Some(&pos) => {
                self.entries[pos] = entry;
                true
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
                false
            }
        }
    }

    pub fn get(&self, key: &EntryKey) -> Option<&RaceEntry> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    /// All entries in arrival order
    pub fn entries(&self) -> &[RaceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one season, in arrival order
    pub fn season(&self, year: u16) -> Vec<&RaceEntry> {
        self.entries.iter().filter(|e| e.year == year).collect()
    }

    /// Entrants of one race, in arrival order
    pub fn race(&self, year: u16, round: u32) -> Vec<&RaceEntry> {
        self.entries
            .iter()
            .filter(|e| e.year == year && e.round == round)
            .collect()
    }

    /// Seasons present, ascending
    pub fn seasons(&self) -> Vec<u16> {
        let years: BTreeSet<u16> = self.entries.iter().map(|e| e.year).collect();
        years.into_iter().collect()
    }

    /// Rounds present in a season, ascending
    pub fn rounds(&self, year: u16) -> Vec<u32> {
        let rounds: BTreeSet<u32> = self
            .entries
            .iter()
            .filter(|e| e.year == year)
            .map(|e| e.round)
            .collect();
        rounds.into_iter().collect()
    }

    pub fn latest_round(&self, year: u16) -> Option<u32> {
        self.entries
            .iter()
            .filter(|e| e.year == year)
            .map(|e| e.round)
            .max()
    }
}
