//! Document sources and the page-extraction seam
//!
//! Extraction itself (PDF parsing, HTML merging) is an external
//! collaborator; the engine only cares about ordered page texts. The
//! source kind is resolved once from the file extension instead of
//! branching on it throughout the indexing path.

use async_trait::async_trait;
use paperdex_common::errors::Result;
use std::path::Path;

/// One extracted page: 1-based page number plus its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPage {
    pub number: i32,
    pub text: String,
}

impl DocumentPage {
    pub fn new(number: i32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Supported document kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource {
    Pdf,
    MergedHtml,
}

impl DocumentSource {
    /// Resolve the source kind from a file extension.
    ///
    /// Returns `None` for unsupported extensions; callers skip those
    /// files rather than erroring.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentSource::Pdf),
            "html" | "htm" => Some(DocumentSource::MergedHtml),
            _ => None,
        }
    }
}

/// Page extraction capability, provided by the host application
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Extract ordered page texts from a document file
    async fn extract_pages(&self, source: DocumentSource, path: &Path) -> Result<Vec<DocumentPage>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_extension() {
        assert_eq!(
            DocumentSource::from_path(Path::new("paper.pdf")),
            Some(DocumentSource::Pdf)
        );
        assert_eq!(
            DocumentSource::from_path(Path::new("thesis.HTML")),
            Some(DocumentSource::MergedHtml)
        );
        assert_eq!(
            DocumentSource::from_path(Path::new("merged.htm")),
            Some(DocumentSource::MergedHtml)
        );
    }

    #[test]
    fn test_unsupported_extensions() {
        assert_eq!(DocumentSource::from_path(Path::new("notes.docx")), None);
        assert_eq!(DocumentSource::from_path(Path::new("noextension")), None);
    }
}
