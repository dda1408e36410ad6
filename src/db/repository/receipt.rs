use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{LifecycleStatus, ReceiptCorrection, ReceiptRecord, VerificationStatus};

const RECEIPT_COLUMNS: &str = "id, owner_id, lifecycle_status, verification_status,
     supplier_name, transaction_date, total_amount, cane_type, weight_kg, price_per_kg,
     raw_extraction, confidence_score, image_url, image_filename,
     processed_at, processing_duration_ms, error_message, created_at, updated_at";

pub fn insert_receipt(conn: &Connection, receipt: &ReceiptRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO receipts (id, owner_id, lifecycle_status, verification_status,
         supplier_name, transaction_date, total_amount, cane_type, weight_kg, price_per_kg,
         raw_extraction, confidence_score, image_url, image_filename,
         processed_at, processing_duration_ms, error_message, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            receipt.id.to_string(),
            receipt.owner_id,
            receipt.lifecycle_status.as_str(),
            receipt.verification_status.as_str(),
            receipt.supplier_name,
            receipt.transaction_date,
            receipt.total_amount,
            receipt.cane_type,
            receipt.weight_kg,
            receipt.price_per_kg,
            receipt.raw_extraction,
            receipt.confidence_score,
            receipt.image_url,
            receipt.image_filename,
            receipt.processed_at,
            receipt.processing_duration_ms,
            receipt.error_message,
            receipt.created_at,
            receipt.updated_at,
        ],
    )?;
    Ok(())
}

/// Fetch a receipt by id, scoped to its owner. Another owner's id behaves
/// exactly like a missing row.
pub fn get_receipt(
    conn: &Connection,
    id: &Uuid,
    owner_id: &str,
) -> Result<Option<ReceiptRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = ?1 AND owner_id = ?2"
    ))?;

    let result = stmt.query_row(params![id.to_string(), owner_id], row_to_raw);

    match result {
        Ok(row) => Ok(Some(receipt_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List an owner's receipts, newest first.
pub fn list_receipts(conn: &Connection, owner_id: &str) -> Result<Vec<ReceiptRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE owner_id = ?1 ORDER BY created_at DESC"
    ))?;

    let rows = stmt.query_map(params![owner_id], row_to_raw)?;

    let mut receipts = Vec::new();
    for row in rows {
        receipts.push(receipt_from_row(row?)?);
    }
    Ok(receipts)
}

/// Apply a human correction to a receipt's business fields.
///
/// Only fields present in the correction are changed. The receipt is forced
/// to `completed` / `corrected` regardless of its prior state, and
/// `raw_extraction` is never touched: it stays the verbatim model output.
pub fn apply_correction(
    conn: &Connection,
    id: &Uuid,
    owner_id: &str,
    correction: &ReceiptCorrection,
) -> Result<ReceiptRecord, DatabaseError> {
    let rows = conn.execute(
        "UPDATE receipts SET
             supplier_name = COALESCE(?3, supplier_name),
             transaction_date = COALESCE(?4, transaction_date),
             total_amount = COALESCE(?5, total_amount),
             cane_type = COALESCE(?6, cane_type),
             weight_kg = COALESCE(?7, weight_kg),
             price_per_kg = COALESCE(?8, price_per_kg),
             lifecycle_status = ?9,
             verification_status = ?10,
             updated_at = ?11
         WHERE id = ?1 AND owner_id = ?2",
        params![
            id.to_string(),
            owner_id,
            correction.supplier_name,
            correction.transaction_date,
            correction.total_amount,
            correction.cane_type,
            correction.weight_kg,
            correction.price_per_kg,
            LifecycleStatus::Completed.as_str(),
            VerificationStatus::Corrected.as_str(),
            Utc::now(),
        ],
    )?;

    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Receipt".into(),
            id: id.to_string(),
        });
    }

    get_receipt(conn, id, owner_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Receipt".into(),
        id: id.to_string(),
    })
}

struct ReceiptRow {
    id: String,
    owner_id: String,
    lifecycle_status: String,
    verification_status: String,
    supplier_name: Option<String>,
    transaction_date: Option<String>,
    total_amount: Option<f64>,
    cane_type: Option<String>,
    weight_kg: Option<f64>,
    price_per_kg: Option<f64>,
    raw_extraction: Option<String>,
    confidence_score: Option<u8>,
    image_url: String,
    image_filename: String,
    processed_at: Option<DateTime<Utc>>,
    processing_duration_ms: Option<i64>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReceiptRow> {
    Ok(ReceiptRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        lifecycle_status: row.get(2)?,
        verification_status: row.get(3)?,
        supplier_name: row.get(4)?,
        transaction_date: row.get(5)?,
        total_amount: row.get(6)?,
        cane_type: row.get(7)?,
        weight_kg: row.get(8)?,
        price_per_kg: row.get(9)?,
        raw_extraction: row.get(10)?,
        confidence_score: row.get(11)?,
        image_url: row.get(12)?,
        image_filename: row.get(13)?,
        processed_at: row.get(14)?,
        processing_duration_ms: row.get(15)?,
        error_message: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn receipt_from_row(row: ReceiptRow) -> Result<ReceiptRecord, DatabaseError> {
    let id = Uuid::from_str(&row.id).map_err(|_| DatabaseError::InvalidEnum {
        field: "id".into(),
        value: row.id.clone(),
    })?;

    Ok(ReceiptRecord {
        id,
        owner_id: row.owner_id,
        lifecycle_status: LifecycleStatus::from_str(&row.lifecycle_status)?,
        verification_status: VerificationStatus::from_str(&row.verification_status)?,
        supplier_name: row.supplier_name,
        transaction_date: row.transaction_date,
        total_amount: row.total_amount,
        cane_type: row.cane_type,
        weight_kg: row.weight_kg,
        price_per_kg: row.price_per_kg,
        raw_extraction: row.raw_extraction,
        confidence_score: row.confidence_score,
        image_url: row.image_url,
        image_filename: row.image_filename,
        processed_at: row.processed_at,
        processing_duration_ms: row.processing_duration_ms,
        error_message: row.error_message,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn sample_receipt(owner: &str) -> ReceiptRecord {
        let now = Utc::now();
        ReceiptRecord {
            id: Uuid::new_v4(),
            owner_id: owner.to_string(),
            lifecycle_status: LifecycleStatus::Completed,
            verification_status: VerificationStatus::Unverified,
            supplier_name: Some("Chemelil Outgrowers".into()),
            transaction_date: Some("2026-02-11".into()),
            total_amount: Some(31850.0),
            cane_type: Some("CO 945".into()),
            weight_kg: Some(1274.0),
            price_per_kg: Some(25.0),
            raw_extraction: Some(r#"{"supplier_name":"Chemelil Outgrowers","weight_kg":1274}"#.into()),
            confidence_score: Some(100),
            image_url: "https://files.example.com/receipts/f1/a.jpg".into(),
            image_filename: "a.jpg".into(),
            processed_at: Some(now),
            processing_duration_ms: Some(2310),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let receipt = sample_receipt("farmer-1");
        insert_receipt(&conn, &receipt).unwrap();

        let fetched = get_receipt(&conn, &receipt.id, "farmer-1").unwrap().unwrap();
        assert_eq!(fetched.id, receipt.id);
        assert_eq!(fetched.supplier_name.as_deref(), Some("Chemelil Outgrowers"));
        assert_eq!(fetched.lifecycle_status, LifecycleStatus::Completed);
        assert_eq!(fetched.confidence_score, Some(100));
        assert_eq!(fetched.weight_kg, Some(1274.0));
    }

    #[test]
    fn get_is_owner_scoped() {
        let conn = open_memory_database().unwrap();
        let receipt = sample_receipt("farmer-1");
        insert_receipt(&conn, &receipt).unwrap();

        assert!(get_receipt(&conn, &receipt.id, "farmer-2").unwrap().is_none());
    }

    #[test]
    fn list_returns_only_owner_rows_newest_first() {
        let conn = open_memory_database().unwrap();
        let mut older = sample_receipt("farmer-1");
        older.created_at = Utc::now() - chrono::Duration::hours(2);
        let newer = sample_receipt("farmer-1");
        let foreign = sample_receipt("farmer-2");
        insert_receipt(&conn, &older).unwrap();
        insert_receipt(&conn, &newer).unwrap();
        insert_receipt(&conn, &foreign).unwrap();

        let listed = list_receipts(&conn, "farmer-1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
    }

    #[test]
    fn correction_updates_only_provided_fields() {
        let conn = open_memory_database().unwrap();
        let receipt = sample_receipt("farmer-1");
        insert_receipt(&conn, &receipt).unwrap();

        let correction = ReceiptCorrection {
            weight_kg: Some(1300.0),
            ..ReceiptCorrection::default()
        };
        let updated = apply_correction(&conn, &receipt.id, "farmer-1", &correction).unwrap();

        assert_eq!(updated.weight_kg, Some(1300.0));
        assert_eq!(updated.supplier_name.as_deref(), Some("Chemelil Outgrowers"));
        assert_eq!(updated.total_amount, Some(31850.0));
    }

    #[test]
    fn correction_forces_completed_and_corrected() {
        let conn = open_memory_database().unwrap();
        let mut receipt = sample_receipt("farmer-1");
        receipt.lifecycle_status = LifecycleStatus::Pending;
        receipt.confidence_score = None;
        insert_receipt(&conn, &receipt).unwrap();

        let updated =
            apply_correction(&conn, &receipt.id, "farmer-1", &ReceiptCorrection::default())
                .unwrap();
        assert_eq!(updated.lifecycle_status, LifecycleStatus::Completed);
        assert_eq!(updated.verification_status, VerificationStatus::Corrected);
    }

    #[test]
    fn correction_never_mutates_raw_extraction() {
        let conn = open_memory_database().unwrap();
        let receipt = sample_receipt("farmer-1");
        let original_raw = receipt.raw_extraction.clone();
        insert_receipt(&conn, &receipt).unwrap();

        let correction = ReceiptCorrection {
            supplier_name: Some("Someone Else".into()),
            weight_kg: Some(1.0),
            ..ReceiptCorrection::default()
        };
        let updated = apply_correction(&conn, &receipt.id, "farmer-1", &correction).unwrap();

        assert_eq!(updated.raw_extraction, original_raw);
    }

    #[test]
    fn correction_of_foreign_receipt_is_not_found() {
        let conn = open_memory_database().unwrap();
        let receipt = sample_receipt("farmer-1");
        insert_receipt(&conn, &receipt).unwrap();

        let result =
            apply_correction(&conn, &receipt.id, "farmer-2", &ReceiptCorrection::default());
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn nullable_fields_survive_round_trip_as_none() {
        let conn = open_memory_database().unwrap();
        let mut receipt = sample_receipt("farmer-1");
        receipt.supplier_name = None;
        receipt.total_amount = None;
        receipt.raw_extraction = None;
        receipt.confidence_score = None;
        receipt.processed_at = None;
        insert_receipt(&conn, &receipt).unwrap();

        let fetched = get_receipt(&conn, &receipt.id, "farmer-1").unwrap().unwrap();
        assert!(fetched.supplier_name.is_none());
        assert!(fetched.total_amount.is_none());
        assert!(fetched.raw_extraction.is_none());
        assert!(fetched.confidence_score.is_none());
        assert!(fetched.processed_at.is_none());
    }
}
