use anyhow::anyhow;
use tracing::info;

use super::DocumentExtractor;

/// Text-layer PDF extraction. Scanned PDFs without a text layer yield empty text.
pub struct PdfTextExtractor;

impl DocumentExtractor for PdfTextExtractor {
    fn extract_text(&self, document: &[u8]) -> anyhow::Result<String> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(document)
            .map_err(|e| anyhow!("Failed to read PDF: {}", e))?;

        info!("Extracted text from {} PDF pages", pages.len());
        Ok(pages.concat())
    }
}
