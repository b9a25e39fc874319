//! The polymorphic block model.
//!
//! A [`Block`] is a tagged variant over the closed [`Kind`] enumeration.
//! Shared fields (id, polygon, page, children, metadata) live on the common
//! header (`Block` itself); kind-specific fields live in [`BlockPayload`].
//! This avoids a class hierarchy: processors pattern-match on the payload
//! rather than downcasting.

use crate::geometry::Polygon;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier of the shape `{page}_{kind}_{counter}`, e.g. `3_table_1`.
///
/// Synthesized blocks (a merged table, a promoted paragraph) get a fresh id
/// from the same scheme; their old ids remain reserved per invariant 7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub String);

impl BlockId {
    /// Builds an id from its three components.
    #[must_use = "creates a new block id"]
    pub fn new(page: usize, kind: Kind, counter: usize) -> Self {
        Self(format!("{page}_{}_{counter}", kind.slug()))
    }
}

impl fmt::Display for BlockId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The closed set of block kinds. New kinds are not added at runtime; the
/// enumeration is the contract every provider and processor matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// The document root. Exactly one per `Document`, id `"0_document_0"`.
    Document,
    /// A page within the document.
    Page,
    /// A single OCR/native text span (a run of the same style).
    Span,
    /// A single geometric line of text, pre-paragraph-join.
    Line,
    /// A joined paragraph of body text.
    Text,
    /// A heading, carries `level` and a `breadcrumb`.
    SectionHeader,
    /// One item of a list.
    ListItem,
    /// A container grouping consecutive `ListItem`s.
    ListGroup,
    /// A table, carries row/col counts, cells, and extraction metadata.
    Table,
    /// One cell of a `Table`.
    TableCell,
    /// A fenced code block, carries detected `language`.
    Code,
    /// A mathematical equation.
    Equation,
    /// A figure container (chart, diagram) distinct from a raw `Picture`.
    Figure,
    /// A raster image region.
    Picture,
    /// A caption attached to a `Table`, `Figure`, or `Picture`.
    Caption,
    /// A footnote.
    Footnote,
    /// Running header, stripped from body flow once detected.
    PageHeader,
    /// Running footer, stripped from body flow once detected.
    PageFooter,
    /// A bibliography / citation entry.
    Reference,
    /// A form field region.
    Form,
    /// Handwritten content detected by the layout model.
    Handwriting,
}

impl Kind {
    /// Lowercase identifier used inside [`BlockId`].
    #[must_use = "returns the kind's id slug"]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Page => "page",
            Self::Span => "span",
            Self::Line => "line",
            Self::Text => "text",
            Self::SectionHeader => "section_header",
            Self::ListItem => "list_item",
            Self::ListGroup => "list_group",
            Self::Table => "table",
            Self::TableCell => "table_cell",
            Self::Code => "code",
            Self::Equation => "equation",
            Self::Figure => "figure",
            Self::Picture => "picture",
            Self::Caption => "caption",
            Self::Footnote => "footnote",
            Self::PageHeader => "page_header",
            Self::PageFooter => "page_footer",
            Self::Reference => "reference",
            Self::Form => "form",
            Self::Handwriting => "handwriting",
        }
    }

    /// Whether blocks of this kind may own `children` (as opposed to being
    /// purely leaf content). Containers are not required to have children,
    /// but non-containers must not.
    #[must_use = "returns whether this kind is a container"]
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Document
                | Self::Page
                | Self::Text
                | Self::SectionHeader
                | Self::ListGroup
                | Self::ListItem
                | Self::Table
                | Self::Figure
        )
    }
}

/// Provenance of a block's text: how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextExtractionMethod {
    /// Extracted from a native text layer (PDF text operators, DOCX runs, …).
    Native,
    /// Produced by OCR over a rasterized region.
    Ocr,
    /// Synthesized by a processor (e.g. a merged table's union text).
    Inferred,
    /// Produced or rewritten by an LLM enhancement call.
    Llm,
}

/// One entry of a section breadcrumb: `(level, title, stable hash of title)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbEntry {
    /// Heading level, 1..6.
    pub level: u8,
    /// Heading text at the time the breadcrumb was built.
    pub title: String,
    /// Stable hash of `title`, stable across re-renders for the same text.
    pub hash: u64,
}

/// One cell of a [`Kind::Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Zero-based row index in the normalized grid.
    pub row_index: usize,
    /// Zero-based column index in the normalized grid.
    pub col_index: usize,
    /// Number of rows this cell spans (>= 1).
    pub row_span: usize,
    /// Number of columns this cell spans (>= 1).
    pub col_span: usize,
    /// Cell text.
    pub text: String,
    /// Whether this cell is part of a header row.
    #[serde(default)]
    pub is_header: bool,
}

impl TableCell {
    /// Convenience constructor for a non-spanning, non-header cell.
    #[must_use = "creates a new table cell"]
    pub fn new(row_index: usize, col_index: usize, text: impl Into<String>) -> Self {
        Self {
            row_index,
            col_index,
            row_span: 1,
            col_span: 1,
            text: text.into(),
            is_header: false,
        }
    }
}

/// How a [`Kind::Table`]'s grid was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableExtractionMethod {
    /// An external ML layout/table-structure model (strategy A, §4.7.1).
    LayoutModel,
    /// The ruled/whitespace heuristic detector with its default parameters.
    HeuristicA,
    /// The ruled/whitespace heuristic detector after a parameter sweep (§4.7.3).
    HeuristicB,
    /// An LLM was used to reconstruct the grid.
    Llm,
}

/// Breakdown of a table candidate's [`TableMetadata::quality_score`], per §4.7.2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    /// Ratio of cells conforming to the rectangular grid.
    pub structure: f64,
    /// Inverse-scaled stdev of per-column x-edges.
    pub alignment: f64,
    /// Fraction of cells matching overlapping OCR/native text.
    pub content: f64,
    /// Penalty for cells that are mostly whitespace when visibly dense.
    pub whitespace: f64,
}

impl QualityBreakdown {
    /// Weighted `combined` score per §4.7.2:
    /// `0.35 * structure + 0.35 * content + 0.15 * alignment + 0.15 * whitespace`.
    #[must_use = "returns the combined weighted score"]
    pub fn combined(&self) -> f64 {
        0.35 * self.structure + 0.35 * self.content + 0.15 * self.alignment + 0.15 * self.whitespace
    }
}

/// Provenance of a merged table (§4.7.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeInfo {
    /// Always `true` on a populated `MergeInfo`; kept explicit to match the
    /// wire schema (`merge_info.was_merged`) rather than relying on `Option`.
    pub was_merged: bool,
    /// Short human-readable reason (e.g. `"page-boundary continuation"`).
    pub reason: String,
    /// Ids of the original tables that were unioned to produce this one.
    pub original_table_ids: Vec<BlockId>,
}

/// Metadata carried by every [`Kind::Table`] block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Which strategy produced the accepted grid.
    pub extraction_method: TableExtractionMethod,
    /// `quality_breakdown.combined()`, cached for quick access.
    pub quality_score: f64,
    /// Full component scores.
    pub quality_breakdown: QualityBreakdown,
    /// Present once a cross-boundary merge has happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_info: Option<MergeInfo>,
    /// Set when no candidate reached the minimum viable score (§4.7.6):
    /// the table carries raw text content only.
    #[serde(default)]
    pub degraded: bool,
    /// Parameters used by the winning heuristic candidate, if any (for
    /// `HeuristicA`/`HeuristicB`), recorded for S5-style diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HeuristicParameters>,
}

/// Parameter record for a heuristic table-detection candidate (§4.7.1, §4.7.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicParameters {
    /// Ruling-detection scale.
    pub line_scale: u32,
    /// Ruling line width in points.
    pub line_width: f64,
    /// Lattice (ruled) or stream (whitespace) detection mode.
    pub flavor: TableFlavor,
    /// Whether text was shifted to align with detected rulings.
    pub shift_text: bool,
    /// Whether text spanning multiple cells was split.
    pub split_text: bool,
}

/// Table detection mode, per §4.7.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFlavor {
    /// Rely on detected horizontal/vertical rulings.
    Lattice,
    /// Infer columns from whitespace gaps when rulings are absent.
    Stream,
}

/// Kind-specific fields. Every variant name matches the [`Kind`] it belongs
/// to; generic kinds with no extra fields use [`BlockPayload::None`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payload_kind")]
pub enum BlockPayload {
    /// No kind-specific fields (Span, Line, Text, ListItem, ListGroup,
    /// Figure, Picture, Caption, Footnote, PageHeader, PageFooter,
    /// Reference, Form, Handwriting, Page, Document).
    None,
    /// Fields for [`Kind::SectionHeader`].
    SectionHeader {
        /// Heading level, 1..6, after normalization by the section builder.
        level: u8,
        /// Breadcrumb path from the document root, inclusive of this header.
        breadcrumb: Vec<BreadcrumbEntry>,
    },
    /// Fields for [`Kind::Table`].
    Table {
        /// Number of rows in the normalized grid.
        rows: usize,
        /// Number of columns in the normalized grid.
        cols: usize,
        /// Flattened cell list; `(row_index, col_index)` pairs are unique.
        cells: Vec<TableCell>,
        /// Extraction provenance and quality scoring.
        metadata: TableMetadata,
    },
    /// Fields for [`Kind::Code`].
    Code {
        /// Detected language, `None` when below `code.min_confidence` or on timeout.
        language: Option<String>,
        /// Confidence in `[0.0, 1.0]` for the detected language.
        language_confidence: f64,
    },
}

/// A node in the document's block tree.
///
/// Shared fields live here; kind-specific fields live in [`Block::payload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Stable identifier, unique within the owning `Document` (invariant 1).
    pub id: BlockId,
    /// The block's kind.
    pub kind: Kind,
    /// Bounding polygon in page coordinates.
    pub polygon: Polygon,
    /// The page this block belongs to (0 for the synthetic `Document` root).
    pub page_id: usize,
    /// Ordered ids of child blocks; only container kinds populate this.
    #[serde(default)]
    pub children: Vec<BlockId>,
    /// Ordered ids of blocks this one is semantically composed of (lines of
    /// a paragraph, cells of a table). Distinct from `children`: a
    /// structure ref doesn't imply visual containment in the tree sense.
    #[serde(default)]
    pub structure_refs: Vec<BlockId>,
    /// How the block's text was obtained.
    pub text_extraction_method: TextExtractionMethod,
    /// Plain-text content, when applicable (empty for pure containers).
    #[serde(default)]
    pub text: String,
    /// Tombstone flag. A removed block is skipped by renderers and
    /// subsequent processors, but its id remains reserved (invariant 7).
    #[serde(default)]
    pub removed: bool,
    /// Open map for processor-added annotations not promoted to a typed
    /// field (confidence scores, merge diagnostics, `error_code`, …).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Kind-specific fields.
    pub payload: BlockPayload,
}

impl Block {
    /// Creates a new block with empty children/structure_refs/metadata and
    /// [`BlockPayload::None`]. Use [`Block::with_payload`] for kinds that
    /// need more.
    #[must_use = "creates a new block"]
    pub fn new(id: BlockId, kind: Kind, polygon: Polygon, page_id: usize) -> Self {
        Self {
            id,
            kind,
            polygon,
            page_id,
            children: Vec::new(),
            structure_refs: Vec::new(),
            text_extraction_method: TextExtractionMethod::Native,
            text: String::new(),
            removed: false,
            metadata: HashMap::new(),
            payload: BlockPayload::None,
        }
    }

    /// Builder-style setter for the kind-specific payload.
    #[must_use = "returns the block with payload set"]
    pub fn with_payload(mut self, payload: BlockPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Builder-style setter for `text`.
    #[must_use = "returns the block with text set"]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder-style setter for `text_extraction_method`.
    #[must_use = "returns the block with extraction method set"]
    pub fn with_extraction_method(mut self, method: TextExtractionMethod) -> Self {
        self.text_extraction_method = method;
        self
    }

    /// Sets an `error_code` + `degraded` marker in metadata for a recoverable
    /// error, per §7's propagation policy.
    pub fn mark_recoverable_error(&mut self, error: &crate::error::DoclingError) {
        self.metadata.insert(
            "error_code".to_string(),
            serde_json::Value::String(error.code().to_string()),
        );
        self.metadata
            .insert("degraded".to_string(), serde_json::Value::Bool(true));
    }

    /// Returns the section level if this is a `SectionHeader`, else `None`.
    #[must_use = "returns the section level if this is a section header"]
    pub const fn section_level(&self) -> Option<u8> {
        match &self.payload {
            BlockPayload::SectionHeader { level, .. } => Some(*level),
            _ => None,
        }
    }

    /// Returns the breadcrumb if this is a `SectionHeader`, else `None`.
    #[must_use = "returns the breadcrumb if this is a section header"]
    pub fn breadcrumb(&self) -> Option<&[BreadcrumbEntry]> {
        match &self.payload {
            BlockPayload::SectionHeader { breadcrumb, .. } => Some(breadcrumb),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_formats_as_page_kind_counter() {
        let id = BlockId::new(3, Kind::Table, 1);
        assert_eq!(id.to_string(), "3_table_1");
    }

    #[test]
    fn quality_breakdown_combined_matches_weights() {
        let breakdown = QualityBreakdown {
            structure: 1.0,
            content: 1.0,
            alignment: 0.0,
            whitespace: 0.0,
        };
        assert!((breakdown.combined() - 0.70).abs() < 1e-9);
    }

    #[test]
    fn container_kinds_are_flagged() {
        assert!(Kind::Table.is_container());
        assert!(!Kind::Span.is_container());
    }
}
