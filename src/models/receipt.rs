use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{LifecycleStatus, VerificationStatus};

/// The six fields the vision models are asked to read off a receipt.
///
/// Every field is optional — a partially legible receipt still yields a
/// usable extraction, and completeness is measured separately by the
/// confidence scorer. Numeric fields deserialize leniently because models
/// frequently quote numbers ("weight_kg": "1250.5").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub cane_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_per_kg: Option<f64>,
}

impl ExtractedFields {
    /// Number of fields in the extraction schema.
    pub const EXPECTED: usize = 6;
}

/// Accept a JSON number, a numeric string, or null.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    })
}

/// A digitized receipt as persisted in the relational store.
///
/// `raw_extraction` is the unmodified parsed model output, written once at
/// creation and never mutated afterwards — the audit trail stays intact even
/// when the user corrects the business fields above it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub lifecycle_status: LifecycleStatus,
    pub verification_status: VerificationStatus,
    pub supplier_name: Option<String>,
    pub transaction_date: Option<String>,
    pub total_amount: Option<f64>,
    pub cane_type: Option<String>,
    pub weight_kg: Option<f64>,
    pub price_per_kg: Option<f64>,
    pub raw_extraction: Option<String>,
    pub confidence_score: Option<u8>,
    pub image_url: String,
    pub image_filename: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub processing_duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Human correction to a receipt's business fields.
///
/// Absent fields are left untouched. Applying any correction, even an empty
/// one, marks the receipt reviewed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReceiptCorrection {
    pub supplier_name: Option<String>,
    pub transaction_date: Option<String>,
    pub total_amount: Option<f64>,
    pub cane_type: Option<String>,
    pub weight_kg: Option<f64>,
    pub price_per_kg: Option<f64>,
}

impl ReceiptRecord {
    pub fn extracted_fields(&self) -> ExtractedFields {
        ExtractedFields {
            supplier_name: self.supplier_name.clone(),
            transaction_date: self.transaction_date.clone(),
            total_amount: self.total_amount,
            cane_type: self.cane_type.clone(),
            weight_kg: self.weight_kg,
            price_per_kg: self.price_per_kg,
        }
    }
}
