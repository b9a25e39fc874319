//! Property-based tests exercising the invariants from spec §8 against
//! arbitrary inputs, rather than the hand-picked cases the unit tests cover.

use docling_core::block::{Block, BlockPayload, Kind, TableCell, TableExtractionMethod};
use docling_core::document::{Document, DocumentMetadata, Page};
use docling_core::geometry::{Polygon, Size};
use docling_core::serializer::{GraphSerializer, JsonSerializer, MarkdownSerializer};
use docling_core::{QualityBreakdown, TableMetadata};
use proptest::prelude::*;

fn text_block(page: usize, counter: usize, text: &str) -> Block {
    Block::new(
        docling_core::block::BlockId::new(page, Kind::Text, counter),
        Kind::Text,
        Polygon::from_rect(0.0, 0.0, 100.0, 20.0),
        page,
    )
    .with_text(text)
}

fn doc_with_one_text_block(text: &str) -> Document {
    let mut doc = Document::new(DocumentMetadata::default());
    doc.add_page(Page::new(1, Size::new(612.0, 792.0)));
    let block = text_block(1, 0, text);
    doc.register_block(block).unwrap();
    doc
}

proptest! {
    /// Property: any text content serializes to JSON without panicking, and
    /// the result parses back as valid JSON (spec §8 round-trip boundary).
    #[test]
    fn json_serialization_never_panics(text in ".{0,500}") {
        let doc = doc_with_one_text_block(&text);
        let serializer = JsonSerializer::new();
        let json = serializer.serialize(&doc).expect("json serialization should not fail");
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(&json);
        prop_assert!(parsed.is_ok(), "serialized document should be valid JSON");
    }

    /// Property: arbitrary text never panics the Markdown renderer, and the
    /// renderer never mutates its input (testable property 6, "renderer
    /// purity") — checked here by re-serializing and comparing.
    #[test]
    fn markdown_renderer_is_pure(text in ".{0,500}") {
        let doc = doc_with_one_text_block(&text);
        let serializer = MarkdownSerializer::new();
        let first = serializer.serialize(&doc);
        let second = serializer.serialize(&doc);
        prop_assert_eq!(first, second, "re-rendering the same Document must be byte-identical");
    }

    /// Property: arbitrary Unicode text round-trips through the graph
    /// renderer without panicking.
    #[test]
    fn graph_serializer_handles_unicode(text in "\\PC{0,200}") {
        let doc = doc_with_one_text_block(&text);
        let serializer = GraphSerializer::new();
        let graph = serializer.to_value(&doc);
        prop_assert!(serde_json::to_string(&graph).is_ok());
    }

    /// Property (invariant 1, unique IDs): `Document::mint_id` never
    /// produces a collision for any sequence of kinds on the same page.
    #[test]
    fn minted_ids_are_always_unique(kinds in prop::collection::vec(0u8..5, 1..50)) {
        let mut doc = Document::new(DocumentMetadata::default());
        doc.add_page(Page::new(1, Size::new(612.0, 792.0)));
        let mut seen = std::collections::HashSet::new();
        for k in kinds {
            let kind = match k {
                0 => Kind::Text,
                1 => Kind::Line,
                2 => Kind::Span,
                3 => Kind::ListItem,
                _ => Kind::Code,
            };
            let id = doc.mint_id(1, kind);
            prop_assert!(seen.insert(id.to_string()), "mint_id produced a duplicate id");
        }
    }

    /// Property (invariant 6, table grid): for any rectangular grid of
    /// 1x1-span cells, the per-row column-span sum equals `cols` and the
    /// per-column row-span sum equals `rows`.
    #[test]
    fn table_grid_sums_hold_for_any_rectangular_dimensions(rows in 1usize..8, cols in 1usize..8) {
        let mut cells = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                cells.push(TableCell::new(r, c, format!("r{r}c{c}")));
            }
        }
        for r in 0..rows {
            let col_span_sum: usize = cells.iter().filter(|c| c.row_index == r).map(|c| c.col_span).sum();
            prop_assert_eq!(col_span_sum, cols);
        }
        for col in 0..cols {
            let row_span_sum: usize = cells.iter().filter(|cell| cell.col_index == col).map(|cell| cell.row_span).sum();
            prop_assert_eq!(row_span_sum, rows);
        }

        let table = Block::new(
            docling_core::block::BlockId::new(1, Kind::Table, 0),
            Kind::Table,
            Polygon::from_rect(0.0, 0.0, 300.0, 200.0),
            1,
        )
        .with_payload(BlockPayload::Table {
            rows,
            cols,
            cells,
            metadata: TableMetadata {
                extraction_method: TableExtractionMethod::HeuristicA,
                quality_score: 0.8,
                quality_breakdown: QualityBreakdown { structure: 1.0, alignment: 1.0, content: 1.0, whitespace: 1.0 },
                merge_info: None,
                degraded: false,
                parameters: None,
            },
        });

        let mut doc = Document::new(DocumentMetadata::default());
        doc.add_page(Page::new(1, Size::new(612.0, 792.0)));
        doc.register_block(table).unwrap();
        let serializer = JsonSerializer::new();
        prop_assert!(serializer.serialize(&doc).is_ok());
    }

    /// Property (invariant 4, geometry consistency): `Polygon::from_rect`
    /// never produces an inverted box for any left/top/right/bottom inputs
    /// once normalized to `l <= r`, `t <= b`.
    #[test]
    fn polygon_from_rect_keeps_normalized_bounds_consistent(
        l in 0.0f64..1000.0, t in 0.0f64..1000.0, r in 0.0f64..1000.0, b in 0.0f64..1000.0,
    ) {
        let (left, right) = if l <= r { (l, r) } else { (r, l) };
        let (top, bottom) = if t <= b { (t, b) } else { (b, t) };
        let poly = Polygon::from_rect(left, top, right, bottom);
        prop_assert!(poly.width() >= 0.0);
        prop_assert!(poly.height() >= 0.0);
        prop_assert!(serde_json::to_string(&poly).is_ok());
    }
}
