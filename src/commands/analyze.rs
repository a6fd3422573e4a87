use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::analysis::Pipeline;
use crate::commands::history::print_record;
use crate::config::Config;

/// Run a local PDF through the same pipeline as the upload endpoint
pub async fn run(config: &Config, path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.pdf");

    println!("\n{} {}", "Processing:".dimmed(), path.display());

    let pipeline = Pipeline::new(config)?;
    let record = pipeline.process_upload(filename, bytes).await?;

    println!("{} Saved analysis\n", "✓".green());
    print_record(&record);

    Ok(())
}
