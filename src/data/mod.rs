//! Data ingestion and storage
//!
//! Raw row coercion, the Entry Store, data sources and training-set assembly.

pub mod dataset;
pub mod raw;
pub mod source;
pub mod store;

pub use dataset::{SplitKind, TrainingSample, TrainingSet};
pub use raw::{MalformedRow, RawEntry};
pub use source::{CsvEntrySource, EntrySource, MemorySource, SourceRows};
pub use store::{EntryStore, IngestReport};
