// Ingestion pipeline: scans a profile directory, classifies raw export
// files and routes each one to its handler
pub mod handlers;
pub mod pipeline;
pub mod scanner;

pub use pipeline::{ingest_profile_dir, IngestError, IngestOutcome, IngestReport, SkippedFile};
pub use scanner::{classify, scan_profile_dir, FileCategory, RawExportFile};
