use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rusqlite::Connection;
use uuid::Uuid;

use super::confidence::completeness_score;
use super::extract::FieldExtractor;
use super::status::resolve_status;
use super::IngestError;
use crate::db::repository::insert_receipt;
use crate::models::{ReceiptRecord, VerificationStatus};
use crate::storage::ObjectStore;

/// MIME types accepted for receipt uploads. `image/jpg` is non-standard but
/// common in the wild.
const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Notified after a receipt lands so derived views can refresh. Failures are
/// logged and swallowed: invalidation is advisory, the receipt is already
/// durable.
pub trait ViewInvalidator: Send + Sync {
    fn invalidate(&self, owner_id: &str) -> Result<(), String>;
}

/// Default invalidator: nothing downstream to refresh, just log.
pub struct LoggingInvalidator;

impl ViewInvalidator for LoggingInvalidator {
    fn invalidate(&self, owner_id: &str) -> Result<(), String> {
        tracing::debug!(owner = %owner_id, "Receipt views invalidated");
        Ok(())
    }
}

/// An uploaded receipt image as received from the transport layer.
pub struct ReceiptUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Orchestrates a single receipt ingestion end to end.
pub struct IngestionPipeline {
    extractor: FieldExtractor,
    store: Arc<dyn ObjectStore>,
    invalidator: Arc<dyn ViewInvalidator>,
    confidence_threshold: u8,
    max_upload_bytes: usize,
}

impl IngestionPipeline {
    pub fn new(
        extractor: FieldExtractor,
        store: Arc<dyn ObjectStore>,
        invalidator: Arc<dyn ViewInvalidator>,
        confidence_threshold: u8,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            extractor,
            store,
            invalidator,
            confidence_threshold,
            max_upload_bytes,
        }
    }

    /// Ingest one receipt image for `owner_id`.
    ///
    /// Extraction failure is not fatal: the receipt is stored anyway, flagged
    /// for manual entry. Storage and persistence failures are fatal, and a
    /// failed insert triggers a compensating delete of the image just
    /// uploaded so no orphaned object survives.
    pub fn ingest(
        &self,
        conn: &Connection,
        owner_id: &str,
        upload: ReceiptUpload,
    ) -> Result<ReceiptRecord, IngestError> {
        let _span = tracing::info_span!("ingest_receipt", owner = %owner_id).entered();
        let started = std::time::Instant::now();

        self.validate(&upload)?;

        let outcome = self.extractor.extract(&upload.bytes, &upload.content_type);
        let fields = outcome.data.clone().unwrap_or_default();
        let score = completeness_score(outcome.data.as_ref());
        let lifecycle_status = resolve_status(score, self.confidence_threshold);

        let object_path = self.object_path(owner_id, &upload);
        self.store
            .put(&object_path, &upload.bytes)
            .map_err(|e| IngestError::StorageWrite(e.to_string()))?;

        let now = Utc::now();
        let record = ReceiptRecord {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            lifecycle_status,
            verification_status: VerificationStatus::Unverified,
            supplier_name: fields.supplier_name,
            transaction_date: fields.transaction_date,
            total_amount: fields.total_amount,
            cane_type: fields.cane_type,
            weight_kg: fields.weight_kg,
            price_per_kg: fields.price_per_kg,
            raw_extraction: outcome.raw.as_ref().map(|raw| raw.to_string()),
            confidence_score: score,
            image_url: self.store.public_url(&object_path),
            image_filename: upload.filename.clone(),
            processed_at: outcome.data.as_ref().map(|_| now),
            processing_duration_ms: Some(started.elapsed().as_millis() as i64),
            error_message: outcome.error,
            created_at: now,
            updated_at: now,
        };

        if let Err(insert_err) = insert_receipt(conn, &record) {
            // Compensate: the image was uploaded but the row never landed.
            // A delete failure is logged, never allowed to mask the insert
            // error the caller needs to see.
            if let Err(delete_err) = self.store.delete(&object_path) {
                tracing::error!(
                    path = %object_path,
                    error = %delete_err,
                    "Compensating delete failed, orphaned image remains"
                );
            } else {
                tracing::warn!(path = %object_path, "Rolled back image upload after insert failure");
            }
            return Err(IngestError::Persistence(insert_err.to_string()));
        }

        if let Err(e) = self.invalidator.invalidate(owner_id) {
            tracing::warn!(owner = %owner_id, error = %e, "View invalidation failed");
        }

        tracing::info!(
            receipt_id = %record.id,
            status = record.lifecycle_status.as_str(),
            confidence = ?record.confidence_score,
            model = ?outcome.model_used,
            elapsed_ms = %started.elapsed().as_millis(),
            "Receipt ingested"
        );

        Ok(record)
    }

    fn validate(&self, upload: &ReceiptUpload) -> Result<(), IngestError> {
        if upload.bytes.is_empty() {
            return Err(IngestError::EmptyUpload);
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(IngestError::TooLarge {
                size: upload.bytes.len(),
                limit: self.max_upload_bytes,
            });
        }
        let mime = upload.content_type.to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(IngestError::UnsupportedType(upload.content_type.clone()));
        }
        Ok(())
    }

    /// Collision-free by construction: millisecond timestamp plus a random
    /// suffix, scoped under the owner.
    fn object_path(&self, owner_id: &str, upload: &ReceiptUpload) -> String {
        let millis = Utc::now().timestamp_millis();
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(8)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        let ext = detect_extension(&upload.bytes)
            .unwrap_or_else(|| extension_from_mime(&upload.content_type));
        format!("receipts/{owner_id}/{millis}_{suffix}.{ext}")
    }
}

/// Sniff the image format from magic bytes.
fn detect_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("png")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

fn extension_from_mime(content_type: &str) -> &'static str {
    match content_type.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}
