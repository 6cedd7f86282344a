//! PDF bytes to plain text.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::extraction::sanitize_text;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Could not read PDF: {0}")]
    Unreadable(String),

    #[error("PDF contains no extractable text")]
    NoText,
}

/// Blocking, CPU-bound text extraction.
pub trait DocumentReader: Send + Sync {
    fn read_text(&self, content: &[u8]) -> Result<String, DocumentError>;
}

/// Extracts the text of every page with `pdf-extract`.
pub struct PdfTextReader;

impl DocumentReader for PdfTextReader {
    fn read_text(&self, content: &[u8]) -> Result<String, DocumentError> {
        let text = pdf_extract::extract_text_from_mem(content)
            .map_err(|e| DocumentError::Unreadable(e.to_string()))?;
        let text = sanitize_text(&text);
        if text.is_empty() {
            return Err(DocumentError::NoText);
        }
        Ok(text)
    }
}

/// Runs `reader` on the blocking pool. A panic inside the reader (malformed
/// PDFs can trigger them) comes back as `Unreadable`.
pub async fn read_document(
    reader: Arc<dyn DocumentReader>,
    content: Bytes,
) -> Result<String, DocumentError> {
    tokio::task::spawn_blocking(move || reader.read_text(&content))
        .await
        .map_err(|e| DocumentError::Unreadable(format!("PDF reader aborted: {e}")))?
}
