//! Health endpoint: probes the database, object storage, and the inference
//! endpoint concurrently.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::types::ApiContext;
use crate::config::APP_VERSION;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: String,
    pub storage: String,
    pub inference: String,
}

/// GET /api/health
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let db_ctx = ctx.clone();
    let store_ctx = ctx.clone();
    let vision_ctx = ctx.clone();

    let database = tokio::task::spawn_blocking(move || probe_database(&db_ctx));
    let storage = tokio::task::spawn_blocking(move || probe_storage(&store_ctx));
    let inference = tokio::task::spawn_blocking(move || probe_inference(&vision_ctx));

    let (database, storage, inference) = tokio::join!(database, storage, inference);
    let checks = HealthChecks {
        database: flatten(database),
        storage: flatten(storage),
        inference: flatten(inference),
    };

    let healthy = [&checks.database, &checks.storage, &checks.inference]
        .iter()
        .all(|c| *c == "ok");

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: APP_VERSION,
        checks,
    })
}

fn flatten(result: Result<Result<(), String>, tokio::task::JoinError>) -> String {
    match result {
        Ok(Ok(())) => "ok".to_string(),
        Ok(Err(e)) => format!("error: {e}"),
        Err(e) => format!("error: {e}"),
    }
}

fn probe_database(ctx: &ApiContext) -> Result<(), String> {
    let conn = ctx.connection().map_err(|e| e.to_string())?;
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| e.to_string())?;
    Ok(())
}

fn probe_storage(ctx: &ApiContext) -> Result<(), String> {
    let path = format!("health/{}", Uuid::new_v4());
    ctx.store.put(&path, b"ok").map_err(|e| e.to_string())?;
    ctx.store.delete(&path).map_err(|e| e.to_string())?;
    Ok(())
}

fn probe_inference(ctx: &ApiContext) -> Result<(), String> {
    ctx.vision.list_models().map_err(|e| e.to_string())?;
    Ok(())
}
