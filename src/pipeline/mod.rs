// ═══════════════════════════════════════════════════════════════════════════
// Receipt ingestion pipeline
//
// A photographed receipt flows through: sanitize-assisted field extraction
// (fallback chain of vision models) → completeness scoring → lifecycle
// status resolution → image upload → database insert. Extraction is
// best-effort; persistence is all-or-nothing, with a compensating image
// delete when the insert fails after the upload succeeded.
// ═══════════════════════════════════════════════════════════════════════════

pub mod confidence;
pub mod extract;
pub mod ingest;
pub mod sanitize;
pub mod status;

pub use extract::{ExtractionOutcome, FieldExtractor};
pub use ingest::{IngestionPipeline, LoggingInvalidator, ReceiptUpload, ViewInvalidator};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("Image too large: {size} bytes exceeds the {limit}-byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Uploaded image is empty")]
    EmptyUpload,

    #[error("Failed to store receipt image: {0}")]
    StorageWrite(String),

    #[error("Failed to persist receipt: {0}")]
    Persistence(String),
}
