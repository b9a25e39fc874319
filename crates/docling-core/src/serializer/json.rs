//! Hierarchical JSON renderer (§6): `{document: {id, metadata, pages: [...]}}`
//! with each block carrying `{id, type, text?, children?, metadata?}`.

use crate::block::{Block, BlockPayload, Kind};
use crate::document::Document;
use serde_json::{json, Map, Value};

/// Options controlling hierarchical JSON rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JsonOptions {
    /// Pretty-print with indentation.
    pub pretty: bool,
    /// Include blocks marked `removed` (tombstones). Default `false`,
    /// matching renderers' contract to ignore them (invariant 7).
    pub include_removed: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            include_removed: false,
        }
    }
}

/// Renders a [`Document`] as hierarchical JSON: pages nest their top-level
/// blocks, which nest their children, matching the document's visual
/// containment rather than the flat block index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct JsonSerializer {
    options: JsonOptions,
}

impl JsonSerializer {
    /// Creates a serializer with default (pretty) options.
    #[must_use = "creates a new serializer"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a serializer with the given options.
    #[must_use = "creates a new serializer"]
    pub const fn with_options(options: JsonOptions) -> Self {
        Self { options }
    }

    /// Renders `doc` to a `serde_json::Value` in the §6 hierarchical shape.
    /// This is the pure projection; [`JsonSerializer::serialize`] just
    /// stringifies it.
    #[must_use = "returns the rendered document value"]
    pub fn to_value(&self, doc: &Document) -> Value {
        let pages: Vec<Value> = doc
            .pages
            .iter()
            .map(|page| {
                let blocks: Vec<Value> = page
                    .top_level_blocks
                    .iter()
                    .filter_map(|id| doc.get(id).ok())
                    .filter(|b| self.options.include_removed || !b.removed)
                    .map(|b| self.block_value(doc, b))
                    .collect();
                json!({
                    "page_num": page.page_no,
                    "blocks": blocks,
                })
            })
            .collect();

        json!({
            "document": {
                "id": "0_document_0",
                "metadata": doc.metadata,
                "pages": pages,
            }
        })
    }

    fn block_value(&self, doc: &Document, block: &Block) -> Value {
        let mut obj = Map::new();
        obj.insert("id".to_string(), json!(block.id.0));
        obj.insert("type".to_string(), json!(block.kind.slug()));
        if !block.text.is_empty() {
            obj.insert("text".to_string(), json!(block.text));
        }
        match &block.payload {
            BlockPayload::SectionHeader { level, breadcrumb } => {
                obj.insert("level".to_string(), json!(level));
                obj.insert(
                    "breadcrumb".to_string(),
                    json!(breadcrumb
                        .iter()
                        .map(|e| json!({"level": e.level, "title": e.title, "hash": e.hash}))
                        .collect::<Vec<_>>()),
                );
            }
            BlockPayload::Table {
                rows,
                cols,
                cells,
                metadata,
            } => {
                obj.insert("rows".to_string(), json!(rows));
                obj.insert("cols".to_string(), json!(cols));
                obj.insert("cells".to_string(), json!(cells));
                obj.insert("table_metadata".to_string(), json!(metadata));
            }
            BlockPayload::Code {
                language,
                language_confidence,
            } => {
                obj.insert("language".to_string(), json!(language));
                obj.insert("language_confidence".to_string(), json!(language_confidence));
            }
            BlockPayload::None => {}
        }
        if !block.metadata.is_empty() {
            obj.insert("metadata".to_string(), json!(block.metadata));
        }
        if !block.children.is_empty() {
            let children: Vec<Value> = block
                .children
                .iter()
                .filter_map(|id| doc.get(id).ok())
                .filter(|b| self.options.include_removed || !b.removed)
                .map(|b| self.block_value(doc, b))
                .collect();
            obj.insert("children".to_string(), json!(children));
        }
        if block.kind == Kind::Table || block.kind == Kind::Text {
            if !block.structure_refs.is_empty() {
                obj.insert(
                    "structure_refs".to_string(),
                    json!(block.structure_refs.iter().map(|i| i.0.clone()).collect::<Vec<_>>()),
                );
            }
        }
        Value::Object(obj)
    }

    /// Stringifies `doc` per the configured pretty/compact option.
    ///
    /// # Errors
    /// Returns an error if `serde_json` fails to serialize the rendered value.
    pub fn serialize(&self, doc: &Document) -> Result<String, serde_json::Error> {
        let value = self.to_value(doc);
        if self.options.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockId, TextExtractionMethod};
    use crate::document::{DocumentMetadata, Page};
    use crate::geometry::{Polygon, Size};

    fn sample_doc() -> Document {
        let mut doc = Document::new(DocumentMetadata {
            title: Some("Report".into()),
            ..Default::default()
        });
        let block = Block::new(
            BlockId::new(1, Kind::Text, 0),
            Kind::Text,
            Polygon::from_rect(0.0, 0.0, 100.0, 20.0),
            1,
        )
        .with_text("Hello world")
        .with_extraction_method(TextExtractionMethod::Native);
        let id = doc.register_block(block).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(612.0, 792.0),
            top_level_blocks: vec![id],
            raster_ref: None,
        });
        doc
    }

    #[test]
    fn renders_hierarchical_shape() {
        let doc = sample_doc();
        let value = JsonSerializer::new().to_value(&doc);
        assert_eq!(value["document"]["id"], json!("0_document_0"));
        assert_eq!(value["document"]["pages"][0]["page_num"], json!(1));
        assert_eq!(value["document"]["pages"][0]["blocks"][0]["text"], json!("Hello world"));
        assert_eq!(value["document"]["pages"][0]["blocks"][0]["type"], json!("text"));
    }

    #[test]
    fn removed_blocks_are_excluded_by_default() {
        let mut doc = sample_doc();
        let id = doc.pages[0].top_level_blocks[0].clone();
        doc.get_mut(&id).unwrap().removed = true;
        let value = JsonSerializer::new().to_value(&doc);
        assert_eq!(value["document"]["pages"][0]["blocks"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn document_internal_round_trip_preserves_structural_equality() {
        // The internal derived JSON (distinct from the §6 rendered artifact
        // above) round-trips the full Document model, including the block
        // index, for property-based and cache-layer use.
        let doc = sample_doc();
        let raw = serde_json::to_string(&doc).unwrap();
        let restored: Document = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc.metadata, restored.metadata);
        assert_eq!(doc.pages, restored.pages);
        assert_eq!(doc.get(&BlockId::new(1, Kind::Text, 0)), restored.get(&BlockId::new(1, Kind::Text, 0)));
    }
}
