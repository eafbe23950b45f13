//! PDF text extraction.

use super::TextExtractor;
use crate::error::ExtractionError;

/// Extracts page text with `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ExtractionError::Pdf(
                "document contains no extractable text".to_string(),
            ));
        }

        tracing::debug!(chars = trimmed.chars().count(), "extracted PDF text");
        Ok(trimmed.to_string())
    }
}
