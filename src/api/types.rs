//! Shared API state and per-request context.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::db::sqlite::open_database;
use crate::inference::VisionClient;
use crate::pipeline::IngestionPipeline;
use crate::storage::ObjectStore;

/// Shared state handed to middleware (via `Extension`) and handlers (via
/// `State`).
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<IngestionPipeline>,
    pub vision: Arc<dyn VisionClient>,
    pub store: Arc<dyn ObjectStore>,
    pub db_path: Arc<PathBuf>,
    /// Bearer token → owner id.
    pub tokens: Arc<HashMap<String, String>>,
    pub max_upload_bytes: usize,
}

impl ApiContext {
    /// Open a fresh connection for the current request. SQLite connections
    /// are not Sync, so handlers open one inside their blocking section.
    pub fn connection(&self) -> Result<Connection, ApiError> {
        open_database(&self.db_path).map_err(|e| ApiError::Internal(e.to_string()))
    }
}

/// Authenticated requester, injected by the auth middleware.
#[derive(Debug, Clone)]
pub struct OwnerContext {
    pub owner_id: String,
}
