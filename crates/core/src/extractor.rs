use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

/// What to do with a page whose text cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageTextPolicy {
    /// Log the page and leave it out of the document text.
    #[default]
    SkipUnreadable,
    /// Fail the whole extraction.
    Strict,
}

pub trait PdfExtractor: Send + Sync {
    /// Returns the text of every page, concatenated in page order.
    fn extract_text(&self, path: &Path) -> Result<String, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor {
    pub policy: PageTextPolicy,
}

impl LopdfExtractor {
    pub fn new(policy: PageTextPolicy) -> Self {
        Self { policy }
    }

    fn concatenate_pages(&self, document: &Document, label: &str) -> Result<String, IngestError> {
        let mut text = String::new();
        for page_no in document.get_pages().into_keys() {
            match document.extract_text(&[page_no]) {
                Ok(page_text) => text.push_str(&page_text),
                Err(error) => match self.policy {
                    PageTextPolicy::SkipUnreadable => {
                        warn!(source = label, page = page_no, %error, "skipping unreadable page");
                    }
                    PageTextPolicy::Strict => {
                        return Err(IngestError::PdfParse(format!(
                            "page {page_no} of {label}: {error}"
                        )));
                    }
                },
            }
        }
        Ok(text)
    }
}

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;
        self.concatenate_pages(&document, &path.to_string_lossy())
    }
}
