use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caneledger::api::{api_router, ApiContext};
use caneledger::config::AppConfig;
use caneledger::db::sqlite::open_database;
use caneledger::inference::{HttpVisionClient, VisionClient};
use caneledger::pipeline::{FieldExtractor, IngestionPipeline, LoggingInvalidator};
use caneledger::storage::{FsObjectStore, ObjectStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caneledger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.storage_root)?;

    // Migrate up front so a broken schema fails startup, not the first request
    open_database(&config.db_path)?;

    if config.api_tokens.is_empty() {
        tracing::warn!("No API tokens configured (CANELEDGER_API_TOKENS); every request will be rejected");
    }

    let vision: Arc<dyn VisionClient> = Arc::new(HttpVisionClient::new(
        &config.inference_url,
        config.inference_timeout_secs,
    ));
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(
        config.storage_root.clone(),
        &config.public_base_url,
    ));

    let extractor = FieldExtractor::new(vision.clone(), config.model_chain.clone());
    let pipeline = IngestionPipeline::new(
        extractor,
        store.clone(),
        Arc::new(LoggingInvalidator),
        config.confidence_threshold,
        config.max_upload_bytes,
    );

    let ctx = ApiContext {
        pipeline: Arc::new(pipeline),
        vision,
        store,
        db_path: Arc::new(config.db_path.clone()),
        tokens: Arc::new(config.api_tokens.clone()),
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = api_router(ctx);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        models = ?config.model_chain,
        "CaneLedger API listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
