use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::storage::{AnalysisSource, Database, DocumentRecord, DocumentStore};

/// Print every stored record, newest first
pub async fn list(config: &Config) -> Result<()> {
    let db = Database::open(config)?;
    let store = DocumentStore::new(&db);

    let records = store.list()?;

    if records.is_empty() {
        println!("{}", "No documents analyzed yet.".dimmed());
        println!(
            "Upload a PDF to {} or run {}.",
            "POST /upload-resume/".cyan(),
            "doc-insights analyze <file.pdf>".cyan()
        );
        return Ok(());
    }

    println!("\n{} ({} documents)\n", "History".bold(), records.len());

    for record in &records {
        print_record(record);
        println!();
    }

    Ok(())
}

pub fn print_record(record: &DocumentRecord) {
    let source = match record.source {
        AnalysisSource::Ai => "ai".green(),
        AnalysisSource::Fallback => "fallback".yellow(),
    };

    println!(
        "  {} {} {} ({})",
        format!("[{}]", record.id).dimmed(),
        record.filename.bold(),
        source,
        format_size(record.size_bytes).dimmed()
    );
    println!(
        "    {} {}",
        "Uploaded:".dimmed(),
        record.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("    {}", record.summary);

    if !record.keywords.is_empty() {
        let keywords: Vec<String> = record
            .keywords
            .iter()
            .map(|k| format!("{} ({})", k.word, k.count))
            .collect();
        println!("    {} {}", "Keywords:".dimmed(), keywords.join(", ").cyan());
    }
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < KB * KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{:.2} MB", bytes / (KB * KB))
    }
}
