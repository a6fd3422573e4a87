use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::Pipeline;
use crate::api;
use crate::config::{self, Config};

/// Start the HTTP API
pub async fn run(config: &Config) -> Result<()> {
    let pipeline = Arc::new(Pipeline::new(config)?);

    let documents = pipeline.count().await?;
    info!(
        data_dir = %config.data_dir()?.display(),
        uploads = %pipeline.uploads_dir().display(),
        documents,
        "Document store ready"
    );
    if config.has_api_key() {
        info!(model = %config.model, endpoint = %config.ai_url, "AI summaries enabled");
    } else {
        warn!(
            "{} not set, running in keyword-only mode",
            config::API_KEY_ENV
        );
    }

    let app = api::router(pipeline, config.max_upload_bytes);
    api::serve(&config.bind_addr(), app).await
}
