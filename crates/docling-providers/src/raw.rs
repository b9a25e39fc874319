//! The external-extractor seam (ties to `spec.md` §1/§4.7.1's "PDF/DOCX/PPTX
//! raw-byte parsing... treated as external collaborators with defined
//! interfaces"), mirroring
//! [`docling_pipeline::table::heuristic::TableLayoutModel`]'s `Null*`-default
//! pattern for the ML layout-model seam.
//!
//! An [`ExternalExtractor`] turns a format's raw bytes into a flat stream of
//! [`RawBlock`]s grouped by [`RawPage`] — intermediate, Provider-agnostic
//! intermediate output that doesn't yet know about `docling-core`'s section
//! hierarchy or table-grid conventions. [`assemble_document`] is the one
//! routine that lifts that stream into a [`docling_core::Document`]; both the
//! thin format-specific providers (`pdf`, `docx`, `pptx`) and, internally,
//! [`crate::html::HtmlProvider`] go through it so every provider assembles a
//! `Document` the same way.

use docling_core::{Block, BlockId, Document, DocumentMetadata, Kind, Page, Polygon, Result, Size, TextExtractionMethod};

/// One span of text recovered by an external extractor, not yet folded into
/// a paragraph or classified beyond a coarse [`Kind`] guess.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpan {
    /// Bounding box in page coordinates.
    pub polygon: Polygon,
    /// The span's text.
    pub text: String,
    /// Best-effort kind classification (`Text`, `SectionHeader`, `Code`, …);
    /// the processor chain is free to revise this.
    pub kind: Kind,
    /// Heading level, meaningful only when `kind == Kind::SectionHeader`.
    pub heading_level: Option<u8>,
}

/// One page's worth of [`RawSpan`]s, in reading order as the extractor saw
/// them (final reading-order reconstruction is `docling-pipeline`'s job).
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    /// 1-based page number.
    pub page_no: usize,
    /// Page dimensions in points.
    pub size: Size,
    /// Spans on this page, in extractor-reported order.
    pub spans: Vec<RawSpan>,
}

/// One fully-extracted document as raw pages, the unit [`ExternalExtractor`]
/// produces and [`assemble_document`] consumes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawBlock {
    /// Document-level title, if the format carries one (DOCX core
    /// properties, PPTX metadata, a PDF `/Info` dictionary entry).
    pub title: Option<String>,
    /// Document creation timestamp, if the format carries one (DOCX/PPTX
    /// `docProps/core.xml`'s `dcterms:created`, a PDF `/Info` dictionary).
    pub created: Option<chrono::DateTime<chrono::Utc>>,
    /// Document last-modified timestamp, if the format carries one
    /// (`dcterms:modified` / PDF `/Info` `ModDate`).
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
    /// The extracted pages.
    pub pages: Vec<RawPage>,
}

/// The out-of-scope raw-byte extraction collaborator: pdfium-class PDF
/// text+layout extraction, an OOXML reader, or any other format-specific
/// decoder that reduces a file to [`RawBlock`].
pub trait ExternalExtractor: Send + Sync {
    /// Extracts `bytes` into a [`RawBlock`].
    ///
    /// # Errors
    /// Returns [`docling_core::DoclingError::CorruptedInput`] when the bytes
    /// don't parse as the expected format, or
    /// [`docling_core::DoclingError::UnsupportedFormat`] when the extractor
    /// declines entirely.
    fn extract(&self, bytes: &[u8]) -> Result<RawBlock>;
}

/// Default collaborator for every format without a real extractor wired in:
/// always declines. Analogous to
/// [`docling_pipeline::table::heuristic::NullLayoutModel`] and
/// [`docling_pipeline::llm::NullLlmClient`] — the crate and its tests
/// exercise the full `Provider` contract without vendoring a real PDF/OOXML
/// parser.
pub struct NullExtractor;

impl ExternalExtractor for NullExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<RawBlock> {
        Err(docling_core::DoclingError::UnsupportedFormat(
            "no external extractor configured for this format".to_string(),
        ))
    }
}

/// Lifts a [`RawBlock`] into a [`Document`], registering one block per span
/// and one page per [`RawPage`] in order. Shared by every `Provider` impl in
/// this crate so a `Document`'s page/block-registration shape never depends
/// on which provider built it.
#[must_use = "returns the assembled document"]
pub fn assemble_document(raw: RawBlock, source_format: docling_core::InputFormat) -> Document {
    let mut doc = Document::new(DocumentMetadata {
        title: raw.title,
        source_format: Some(source_format),
        created: raw.created,
        modified: raw.modified,
        ..DocumentMetadata::default()
    });

    for raw_page in raw.pages {
        let mut top_level_blocks = Vec::with_capacity(raw_page.spans.len());
        for (counter, span) in raw_page.spans.into_iter().enumerate() {
            let id = BlockId::new(raw_page.page_no, span.kind, counter);
            let mut block = Block::new(id.clone(), span.kind, span.polygon, raw_page.page_no)
                .with_text(span.text)
                .with_extraction_method(TextExtractionMethod::Native);
            if span.kind == Kind::SectionHeader {
                block = block.with_payload(docling_core::BlockPayload::SectionHeader {
                    level: span.heading_level.unwrap_or(1),
                    breadcrumb: Vec::new(),
                });
            }
            doc.register_block(block).expect("fresh document never rejects registration");
            top_level_blocks.push(id);
        }
        doc.add_page(Page {
            page_no: raw_page.page_no,
            size: raw_page.size,
            top_level_blocks,
            raster_ref: None,
        });
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::InputFormat;

    #[test]
    fn null_extractor_always_declines() {
        let err = NullExtractor.extract(b"anything").unwrap_err();
        assert!(matches!(err, docling_core::DoclingError::UnsupportedFormat(_)));
    }

    #[test]
    fn assemble_document_registers_one_block_per_span_in_order() {
        let raw = RawBlock {
            title: Some("Report".to_string()),
            pages: vec![RawPage {
                page_no: 1,
                size: Size::new(612.0, 792.0),
                spans: vec![
                    RawSpan {
                        polygon: Polygon::from_rect(0.0, 0.0, 100.0, 20.0),
                        text: "Heading".to_string(),
                        kind: Kind::SectionHeader,
                        heading_level: Some(1),
                    },
                    RawSpan {
                        polygon: Polygon::from_rect(0.0, 20.0, 100.0, 40.0),
                        text: "Body text".to_string(),
                        kind: Kind::Text,
                        heading_level: None,
                    },
                ],
            }],
            ..RawBlock::default()
        };
        let doc = assemble_document(raw, InputFormat::Pdf);
        assert_eq!(doc.metadata.title.as_deref(), Some("Report"));
        assert_eq!(doc.metadata.source_format, Some(InputFormat::Pdf));
        let page = &doc.pages()[0];
        assert_eq!(page.top_level_blocks.len(), 2);
        let header = doc.get(&page.top_level_blocks[0]).unwrap();
        assert_eq!(header.kind, Kind::SectionHeader);
        assert_eq!(header.text, "Heading");
        let body = doc.get(&page.top_level_blocks[1]).unwrap();
        assert_eq!(body.kind, Kind::Text);
        assert_eq!(body.text, "Body text");
    }

    #[test]
    fn assemble_document_handles_empty_pages() {
        let raw = RawBlock::default();
        let doc = assemble_document(raw, InputFormat::Docx);
        assert_eq!(doc.pages().len(), 0);
        assert_eq!(doc.block_count(), 0);
    }
}
