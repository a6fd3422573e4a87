use anyhow::Context;
use chrono::{SubsecRound, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::keywords::{self, Keyword, KeywordConfig};
use crate::config::Config;
use crate::ingest::{self, ExtractionError};
use crate::llm::{AiResult, AiUnavailable, ChatClient};
use crate::storage::{AnalysisSource, Database, DocumentRecord, DocumentStore};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("Storage failure: {0:#}")]
    Storage(anyhow::Error),
}

/// Summary and keywords for one document, before it becomes a record
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub summary: String,
    pub source: AnalysisSource,
    pub keywords: Vec<Keyword>,
}

/// Sequences extraction, the AI attempt, the keyword fallback and persistence
/// for a single upload.
pub struct Pipeline {
    db: Arc<Mutex<Database>>,
    uploads_dir: PathBuf,
    client: ChatClient,
    keywords: KeywordConfig,
}

impl Pipeline {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let db = Database::open(config)?;
        let uploads_dir = config.uploads_dir()?;
        std::fs::create_dir_all(&uploads_dir)
            .with_context(|| format!("Failed to create uploads directory: {:?}", uploads_dir))?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            uploads_dir,
            client: ChatClient::from_config(config)?,
            keywords: config.keywords.clone(),
        })
    }

    pub fn is_ai_configured(&self) -> bool {
        self.client.is_configured()
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Analyze one uploaded PDF and persist the resulting record.
    ///
    /// Nothing is stored when extraction fails. If the insert fails the
    /// retained upload is removed again and the analysis is lost.
    pub async fn process_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord, UploadError> {
        let size_bytes = bytes.len() as u64;

        let (bytes, extracted) = tokio::task::spawn_blocking(move || {
            let text = ingest::extract(&bytes);
            (bytes, text)
        })
        .await
        .map_err(|e| ExtractionError::Unreadable(format!("extraction task failed: {}", e)))?;
        let text = extracted?;
        debug!(filename, chars = text.chars().count(), "Extracted text");

        let analysis = self.analyze(&text).await;

        let record = DocumentRecord {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            size_bytes,
            summary: analysis.summary,
            source: analysis.source,
            keywords: analysis.keywords,
            uploaded_at: Utc::now().trunc_subsecs(6),
        };

        let path = self.retain_upload(record.id, &bytes).await?;

        let stored = record.clone();
        if let Err(e) = self
            .with_store(move |store| store.insert(&stored))
            .await
        {
            error!(id = %record.id, error = %e, "Failed to store document record");
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %rm, "Failed to remove orphaned upload");
            }
            return Err(e);
        }

        info!(
            id = %record.id,
            filename = %record.filename,
            source = %record.source,
            "Processed and saved document"
        );
        Ok(record)
    }

    /// Try the AI summary, fall back to keyword counting.
    ///
    /// Keywords are always computed; on the AI path they are supplementary.
    pub async fn analyze(&self, text: &str) -> Analysis {
        let fallback = keywords::analyze(text, &self.keywords);

        if text.trim().is_empty() {
            debug!("Document has no text, skipping AI summary");
            return Analysis {
                summary: fallback.summary,
                source: AnalysisSource::Fallback,
                keywords: fallback.keywords,
            };
        }

        match self.client.summarize(text).await {
            AiResult::Success(summary) => Analysis {
                summary,
                source: AnalysisSource::Ai,
                keywords: fallback.keywords,
            },
            AiResult::Unavailable(cause) => {
                match &cause {
                    AiUnavailable::MissingApiKey => {
                        debug!("No API key configured, using keyword analysis")
                    }
                    other => warn!(error = %other, "AI summary unavailable, using keyword analysis"),
                }
                Analysis {
                    summary: fallback.summary,
                    source: AnalysisSource::Fallback,
                    keywords: fallback.keywords,
                }
            }
        }
    }

    /// All records, most recent first
    pub async fn history(&self) -> Result<Vec<DocumentRecord>, UploadError> {
        self.with_store(|store| store.list()).await
    }

    pub async fn count(&self) -> Result<i64, UploadError> {
        self.with_store(|store| store.count()).await
    }

    async fn retain_upload(&self, id: Uuid, bytes: &[u8]) -> Result<PathBuf, UploadError> {
        let path = self.uploads_dir.join(format!("{}.pdf", id));
        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .with_context(|| format!("Failed to create uploads directory: {:?}", self.uploads_dir))
            .map_err(UploadError::Storage)?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to save upload to {:?}", path))
            .map_err(UploadError::Storage)?;
        Ok(path)
    }

    /// Run a store operation on the blocking pool; the lock never spans an await
    async fn with_store<T, F>(&self, f: F) -> Result<T, UploadError>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentStore<'_>) -> anyhow::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db
                .lock()
                .map_err(|_| anyhow::anyhow!("Database lock poisoned"))?;
            f(&DocumentStore::new(&db))
        })
        .await
        .context("Database task failed")
        .and_then(|result| result)
        .map_err(UploadError::Storage)
    }
}
