//! Raw text extraction — the external collaborator that turns PDF bytes into
//! text. Opaque to the pipeline, which only sees the trait boundary.

use crate::errors::AppError;

pub trait TextExtractor: Send + Sync {
    /// Extracts raw text from document bytes. Fails when the document cannot
    /// be parsed or yields no usable text.
    fn extract(&self, bytes: &[u8]) -> Result<String, AppError>;
}

/// pdf-extract backed implementation.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, AppError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| AppError::Extraction(format!("PDF text extraction failed: {e}")))?;
        if text.trim().is_empty() {
            return Err(AppError::Extraction(
                "PDF contained no extractable text".to_string(),
            ));
        }
        Ok(text)
    }
}
