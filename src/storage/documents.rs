use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Database;
use crate::analysis::Keyword;

/// Which path produced a record's summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Ai,
    Fallback,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Ai => "ai",
            AnalysisSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for AnalysisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ai" => Ok(AnalysisSource::Ai),
            "fallback" => Ok(AnalysisSource::Fallback),
            other => anyhow::bail!("Unknown analysis source: {}", other),
        }
    }
}

/// One analyzed upload. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub filename: String,
    pub size_bytes: u64,
    pub summary: String,
    pub source: AnalysisSource,
    pub keywords: Vec<Keyword>,
    pub uploaded_at: DateTime<Utc>,
}

pub struct DocumentStore<'a> {
    db: &'a Database,
}

impl<'a> DocumentStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new record
    pub fn insert(&self, record: &DocumentRecord) -> Result<()> {
        let keywords =
            serde_json::to_string(&record.keywords).context("Failed to encode keywords")?;
        let size = i64::try_from(record.size_bytes).context("File size out of range")?;

        self.db
            .conn
            .execute(
                "INSERT INTO documents (id, filename, size_bytes, uploaded_at, source, summary, keywords)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id.to_string(),
                    record.filename,
                    size,
                    record.uploaded_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                    record.source.as_str(),
                    record.summary,
                    keywords,
                ],
            )
            .context("Failed to insert document")?;

        Ok(())
    }

    /// List all records, most recent first
    pub fn list(&self) -> Result<Vec<DocumentRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, filename, size_bytes, uploaded_at, source, summary, keywords
             FROM documents ORDER BY uploaded_at DESC, rowid DESC",
        )?;

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(Self::row_to_record(row)?);
        }

        Ok(records)
    }

    /// Get record count
    pub fn count(&self) -> Result<i64> {
        let count: i64 =
            self.db
                .conn
                .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        Ok(count)
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<DocumentRecord> {
        let id: String = row.get(0)?;
        let size: i64 = row.get(2)?;
        let uploaded_str: String = row.get(3)?;
        let source: String = row.get(4)?;
        let keywords: String = row.get(6)?;

        Ok(DocumentRecord {
            id: Uuid::parse_str(&id).with_context(|| format!("Invalid document id {:?}", id))?,
            filename: row.get(1)?,
            size_bytes: u64::try_from(size).context("Negative file size")?,
            summary: row.get(5)?,
            source: source.parse()?,
            keywords: serde_json::from_str(&keywords)
                .with_context(|| format!("Invalid keywords for document {}", id))?,
            uploaded_at: DateTime::parse_from_rfc3339(&uploaded_str)
                .context("Invalid uploaded_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
