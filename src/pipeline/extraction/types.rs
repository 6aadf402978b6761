use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Text pulled out of an uploaded PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub pages: Vec<PageExtraction>,
    /// Non-empty page texts joined by a blank line.
    pub full_text: String,
    pub page_count: usize,
}

/// Per-page extraction result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
}

impl ExtractedDocument {
    /// Assemble a document from its pages, skipping pages without text.
    pub fn from_pages(pages: Vec<PageExtraction>) -> Self {
        let page_count = pages.len();
        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            pages,
            full_text,
            page_count,
        }
    }

    pub fn char_count(&self) -> usize {
        self.full_text.chars().count()
    }
}

/// PDF text extraction abstraction
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError>;

    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;
}
