//! Export pipeline for tablefill.
//!
//! A [`Worker`] turns one task descriptor into a SQL file of batched INSERT
//! statements while streaming progress events; the
//! [`ArchiveConsolidator`] later bundles finished files into one archive.

pub mod archive;
pub mod errors;
pub mod progress;
pub mod result;
pub mod worker;
pub mod writer;

pub use archive::{
    ArchiveConsolidator, ArchiveEntry, ArchiveOutcome, FileProbe, OpenProbe, load_manifest,
};
pub use errors::ExportError;
pub use progress::{DEFAULT_PROGRESS_INTERVAL, ProgressEvent, ProgressReporter};
pub use result::ExportResult;
pub use worker::{Worker, WorkerOptions, WorkerPhase};
pub use writer::{DEFAULT_BATCH_SIZE, SqlBatchWriter};
