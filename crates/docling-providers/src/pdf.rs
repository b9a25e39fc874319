//! PDF provider (§4.2): a thin adapter around an injected
//! [`raw::ExternalExtractor`]. PDF text/layout extraction is, per `spec.md`
//! §1, an out-of-scope external collaborator — this type only wires that
//! collaborator's output into [`raw::assemble_document`].

use std::sync::Arc;

use docling_core::{Document, InputFormat, Result};

use crate::raw::{assemble_document, ExternalExtractor, NullExtractor};
use crate::Provider;

/// Parses PDF bytes by delegating to an injected [`ExternalExtractor`],
/// defaulting to [`NullExtractor`] when none is configured.
pub struct PdfProvider {
    extractor: Arc<dyn ExternalExtractor>,
}

impl PdfProvider {
    /// Creates a provider backed by `extractor`.
    #[must_use = "creates a new provider"]
    pub fn new(extractor: Arc<dyn ExternalExtractor>) -> Self {
        Self { extractor }
    }
}

impl Default for PdfProvider {
    fn default() -> Self {
        Self::new(Arc::new(NullExtractor))
    }
}

impl Provider for PdfProvider {
    fn format(&self) -> InputFormat {
        InputFormat::Pdf
    }

    fn parse_bytes(&self, bytes: &[u8]) -> Result<Document> {
        let raw = self.extractor.extract(bytes)?;
        Ok(assemble_document(raw, InputFormat::Pdf))
    }
}
