use super::sanitize::sanitize_extracted_text;
use super::types::{ExtractedDocument, PageExtraction, PdfExtractor};
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        let page_texts = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        let pages = page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageExtraction {
                page_number: i + 1,
                text: sanitize_extracted_text(&text),
            })
            .collect();

        Ok(pages)
    }

    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;
        Ok(pages.len())
    }
}

/// Extract the full text of an uploaded PDF.
///
/// Scanned PDFs without a text layer yield `ExtractionError::NoText`;
/// there is no OCR fallback.
pub fn extract_text_from_pdf(
    extractor: &dyn PdfExtractor,
    pdf_bytes: &[u8],
) -> Result<ExtractedDocument, ExtractionError> {
    if !pdf_bytes.starts_with(b"%PDF") {
        return Err(ExtractionError::UnsupportedFormat(
            "file does not start with a PDF header".into(),
        ));
    }

    let pages = extractor.extract_text(pdf_bytes)?;
    let document = ExtractedDocument::from_pages(pages);

    if document.full_text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }

    tracing::info!(
        pages = document.page_count,
        chars = document.char_count(),
        "PDF text extracted"
    );

    Ok(document)
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Generate a valid PDF with text using lopdf (the library that pdf-extract uses internally).
    pub fn make_test_pdf(pages: &[&str]) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();

        for text in pages {
            // BT /F1 12 Tf (text) Tj ET
            let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! {
                        "F1" => font_id,
                    },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });

        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}
