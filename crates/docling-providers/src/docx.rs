//! DOCX provider (§4.2): a thin adapter around an injected
//! [`raw::ExternalExtractor`], identical in shape to [`crate::pdf::PdfProvider`]
//! — OOXML parsing is the out-of-scope collaborator here, not this crate.

use std::sync::Arc;

use docling_core::{Document, InputFormat, Result};

use crate::raw::{assemble_document, ExternalExtractor, NullExtractor};
use crate::Provider;

/// Parses DOCX bytes by delegating to an injected [`ExternalExtractor`],
/// defaulting to [`NullExtractor`] when none is configured.
pub struct DocxProvider {
    extractor: Arc<dyn ExternalExtractor>,
}

impl DocxProvider {
    /// Creates a provider backed by `extractor`.
    #[must_use = "creates a new provider"]
    pub fn new(extractor: Arc<dyn ExternalExtractor>) -> Self {
        Self { extractor }
    }
}

impl Default for DocxProvider {
    fn default() -> Self {
        Self::new(Arc::new(NullExtractor))
    }
}

impl Provider for DocxProvider {
    fn format(&self) -> InputFormat {
        InputFormat::Docx
    }

    fn parse_bytes(&self, bytes: &[u8]) -> Result<Document> {
        let raw = self.extractor.extract(bytes)?;
        Ok(assemble_document(raw, InputFormat::Docx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_declines_without_a_configured_extractor() {
        let provider = DocxProvider::default();
        let err = provider.parse_bytes(b"PK\x03\x04...").unwrap_err();
        assert!(matches!(err, docling_core::DoclingError::UnsupportedFormat(_)));
    }

    #[test]
    fn reports_docx_as_its_format() {
        assert_eq!(DocxProvider::default().format(), InputFormat::Docx);
    }
}
