use std::panic;
use thiserror::Error;
use tracing::warn;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Uploaded file is not a PDF document")]
    NotPdf,
    #[error("Could not extract text from PDF: {0}")]
    Unreadable(String),
}

/// Extract text content from PDF bytes.
///
/// A readable PDF without any text layer (a scanned page, a blank page)
/// yields an empty string rather than an error.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::Empty);
    }
    if !looks_like_pdf(bytes) {
        return Err(ExtractionError::NotPdf);
    }

    // pdf_extract can panic on complex or malformed PDFs
    let extract_result = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    let text = match extract_result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(error = %e, "pdf_extract failed, trying lopdf");
            extract_with_lopdf(bytes)?
        }
        Err(_) => {
            warn!("pdf_extract crashed, trying lopdf");
            extract_with_lopdf(bytes)?
        }
    };

    Ok(clean(&text))
}

/// True when the bytes open with the `%PDF-` header, ignoring leading whitespace
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(PDF_MAGIC)
}

/// Trim every line and drop the blank ones
fn clean(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fallback PDF text extraction using lopdf.
///
/// Only reached once pdf_extract has given up, so an empty result means the
/// document could not be read, not that it is blank.
fn extract_with_lopdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    use lopdf::Document;

    let loaded = panic::catch_unwind(|| Document::load_mem(bytes))
        .map_err(|_| ExtractionError::Unreadable("PDF parser crashed".to_string()))?;
    let doc = loaded.map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

    let pages = doc
        .get_pages()
        .into_keys()
        .map(|page_num| (page_num, doc.extract_text(&[page_num])));
    join_pages(pages)
}

/// Concatenate per-page text, failing on the first unreadable page
fn join_pages<E, I>(pages: I) -> Result<String, ExtractionError>
where
    E: std::fmt::Display,
    I: IntoIterator<Item = (u32, Result<String, E>)>,
{
    let mut text = String::new();
    for (page_num, page_text) in pages {
        let page_text = page_text
            .map_err(|e| ExtractionError::Unreadable(format!("page {}: {}", page_num, e)))?;
        text.push_str(&page_text);
        text.push('\n');
    }

    if text.trim().is_empty() {
        return Err(ExtractionError::Unreadable(
            "no text could be recovered from the document".to_string(),
        ));
    }

    Ok(text)
}
