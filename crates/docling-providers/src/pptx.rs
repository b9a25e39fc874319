//! PPTX provider (§4.2): a thin adapter around an injected
//! [`raw::ExternalExtractor`], identical in shape to [`crate::pdf::PdfProvider`]
//! — OOXML slide parsing is the out-of-scope collaborator here, not this
//! crate. Each slide maps to one `RawPage`.

use std::sync::Arc;

use docling_core::{Document, InputFormat, Result};

use crate::raw::{assemble_document, ExternalExtractor, NullExtractor};
use crate::Provider;

/// Parses PPTX bytes by delegating to an injected [`ExternalExtractor`],
/// defaulting to [`NullExtractor`] when none is configured.
pub struct PptxProvider {
    extractor: Arc<dyn ExternalExtractor>,
}

impl PptxProvider {
    /// Creates a provider backed by `extractor`.
    #[must_use = "creates a new provider"]
    pub fn new(extractor: Arc<dyn ExternalExtractor>) -> Self {
        Self { extractor }
    }
}

impl Default for PptxProvider {
    fn default() -> Self {
        Self::new(Arc::new(NullExtractor))
    }
}

impl Provider for PptxProvider {
    fn format(&self) -> InputFormat {
        InputFormat::Pptx
    }

    fn parse_bytes(&self, bytes: &[u8]) -> Result<Document> {
        let raw = self.extractor.extract(bytes)?;
        Ok(assemble_document(raw, InputFormat::Pptx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_declines_without_a_configured_extractor() {
        let provider = PptxProvider::default();
        let err = provider.parse_bytes(b"PK\x03\x04...").unwrap_err();
        assert!(matches!(err, docling_core::DoclingError::UnsupportedFormat(_)));
    }

    #[test]
    fn reports_pptx_as_its_format() {
        assert_eq!(PptxProvider::default().format(), InputFormat::Pptx);
    }
}
