//! Receipt endpoints: multipart upload, listing, detail, and correction.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, OwnerContext};
use crate::db::repository;
use crate::models::{ReceiptCorrection, ReceiptRecord};
use crate::pipeline::ReceiptUpload;

#[derive(Serialize)]
pub struct ReceiptListResponse {
    pub receipts: Vec<ReceiptRecord>,
    pub total: usize,
}

/// POST /api/receipts: ingest a photographed receipt.
///
/// The image travels as a multipart field named `file`. The whole pipeline
/// is synchronous and runs on the blocking pool.
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(owner): Extension<OwnerContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ReceiptRecord>), ApiError> {
    let mut upload: Option<ReceiptUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("receipt").to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                mime_guess::from_path(&filename)
                    .first_raw()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?
            .to_vec();

        upload = Some(ReceiptUpload {
            filename,
            content_type,
            bytes,
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".into()))?;

    let record = tokio::task::spawn_blocking(move || {
        let conn = ctx.connection()?;
        ctx.pipeline
            .ingest(&conn, &owner.owner_id, upload)
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/receipts: the requester's receipts, newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(owner): Extension<OwnerContext>,
) -> Result<Json<ReceiptListResponse>, ApiError> {
    let receipts = tokio::task::spawn_blocking(move || {
        let conn = ctx.connection()?;
        repository::list_receipts(&conn, &owner.owner_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let total = receipts.len();
    Ok(Json(ReceiptListResponse { receipts, total }))
}

/// GET /api/receipts/:id
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReceiptRecord>, ApiError> {
    let record = tokio::task::spawn_blocking(move || {
        let conn = ctx.connection()?;
        repository::get_receipt(&conn, &id, &owner.owner_id).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    record
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Receipt {id} not found")))
}

/// PATCH /api/receipts/:id: apply a human correction.
pub async fn correct(
    State(ctx): State<ApiContext>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<Uuid>,
    Json(correction): Json<ReceiptCorrection>,
) -> Result<Json<ReceiptRecord>, ApiError> {
    let record = tokio::task::spawn_blocking(move || {
        let conn = ctx.connection()?;
        repository::apply_correction(&conn, &id, &owner.owner_id, &correction)
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(record))
}
