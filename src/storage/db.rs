use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

pub struct Database {
    pub conn: Connection,
    pub path: PathBuf,
}

impl Database {
    /// Open or create the database configured for this service
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_at_path(config.db_path()?)
    }

    /// Open or create a database at a specific path
    pub fn open_at_path(path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;

        let db = Self { conn, path };
        db.init_schema()?;
        info!(path = %db.path.display(), "Database ready");

        Ok(db)
    }

    /// Initialize database schema. Safe to run on every start.
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                    id TEXT PRIMARY KEY,
                    filename TEXT NOT NULL,
                    size_bytes INTEGER NOT NULL,
                    uploaded_at TEXT NOT NULL,
                    source TEXT NOT NULL CHECK (source IN ('ai', 'fallback')),
                    summary TEXT NOT NULL,
                    keywords TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS documents_uploaded_at
                    ON documents (uploaded_at);",
            )
            .context("Failed to initialize database schema")?;

        Ok(())
    }
}
