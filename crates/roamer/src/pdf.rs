//! Text extraction from PDF files.

use lopdf::Document;
use roamer_core::{DocumentExtractor, IngestError};

/// Reads the text layer of a PDF, page by page.
///
/// Scanned pages without a text layer contribute nothing. A page whose
/// text can't be decoded is skipped; the document only fails as a whole
/// when it can't be parsed at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfExtractor {
    _priv: (),
}

impl PdfExtractor {
    /// Creates an extractor.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let document = Document::load_mem(bytes)
            .map_err(|err| IngestError::Unreadable(err.to_string()))?;

        let mut text = String::new();
        for page_number in document.get_pages().into_keys() {
            match document.extract_text(&[page_number]) {
                Ok(page_text) => text.push_str(&page_text),
                Err(err) => {
                    warn!("skipping page {page_number}: {err}");
                }
            }
        }
        Ok(text.trim().to_owned())
    }
}
