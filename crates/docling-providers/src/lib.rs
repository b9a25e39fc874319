//! # docling-providers
//!
//! Format adapters that turn raw file bytes into a finalized, ready-to-process
//! [`docling_core::Document`] (§4.2's Provider contract).
//!
//! Two are fully implemented here, since both reduce to walking an
//! already-parsed tree with an off-the-shelf crate rather than any ML
//! inference: [`html::HtmlProvider`] (via `scraper`) and [`xml::XmlProvider`]
//! (via `roxmltree`). PDF, DOCX, and PPTX are, per `spec.md` §1, "format-specific
//! raw-byte parsers... treated as external collaborators with defined
//! interfaces" — [`pdf::PdfProvider`], [`docx::DocxProvider`], and
//! [`pptx::PptxProvider`] are thin adapters around an injected
//! [`raw::ExternalExtractor`], the same `Null*`-default seam pattern used for
//! the table layout model and the LLM client in `docling-pipeline`.
//!
//! [`raw::assemble_document`] is the one routine that lifts a flat
//! [`raw::RawBlock`] stream into a `Document`; every provider in this crate
//! goes through it (or, for HTML/XML, builds on the same block-registration
//! conventions directly for richer structures like tables).

pub mod docx;
pub mod html;
pub mod pdf;
pub mod pptx;
pub mod raw;
pub mod xml;

use std::path::Path;

pub use docx::DocxProvider;
pub use html::HtmlProvider;
pub use pdf::PdfProvider;
pub use pptx::PptxProvider;
pub use raw::{ExternalExtractor, NullExtractor, RawBlock, RawPage, RawSpan};
pub use xml::XmlProvider;

use docling_core::{Document, InputFormat, Result};

/// Contract every format adapter satisfies (§4.2): bytes plus implicit
/// config in, a finalized `Document` out, or a fatal
/// `UnsupportedFormat`/`CorruptedInput`/`IoError`.
pub trait Provider: Send + Sync {
    /// The format this provider handles.
    fn format(&self) -> InputFormat;

    /// Parses `bytes` into a finalized `Document`.
    ///
    /// # Errors
    /// Returns [`docling_core::DoclingError::UnsupportedFormat`] or
    /// [`docling_core::DoclingError::CorruptedInput`] per §4.2's error
    /// contract.
    fn parse_bytes(&self, bytes: &[u8]) -> Result<Document>;

    /// Reads `path` and parses it. The default implementation just reads the
    /// file and delegates to [`Provider::parse_bytes`].
    ///
    /// # Errors
    /// Propagates [`docling_core::DoclingError::Io`] or whatever
    /// [`Provider::parse_bytes`] returns.
    fn parse_file(&self, path: &Path) -> Result<Document> {
        let bytes = std::fs::read(path)?;
        self.parse_bytes(&bytes)
    }
}

/// Selects the provider registered for `format` out of a caller-supplied
/// table, the same explicit-factory-table pattern `docling-pipeline` uses
/// for processors (§9: "replace global registries with an explicit factory
/// table").
#[must_use = "returns the matching provider, if any"]
pub fn select<'a>(providers: &'a [Box<dyn Provider>], format: InputFormat) -> Option<&'a dyn Provider> {
    providers.iter().find(|p| p.format() == format).map(AsRef::as_ref)
}
