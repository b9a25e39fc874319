//! Graph JSON renderer (§6): a flat vertex/edge projection suitable for
//! loading into a graph store, as opposed to [`crate::serializer::json`]'s
//! nested tree shape.
//!
//! `{vertices: {documents, sections, blocks, entities}, edges: {contains,
//! references, relates_to}, metadata: {source_file, processing_time,
//! schema_version}}`. Vertex keys are block ids; edge keys are
//! `{_from, _to, _type}` triples, named after the two graph-store-facing
//! collections (vertex/edge) the upstream system's client expects, without
//! this crate performing any I/O itself (the client is out of scope, §1).

use crate::block::{Block, BlockPayload, Kind};
use crate::document::Document;
use serde::Serialize;
use serde_json::{json, Value};

/// Options controlling graph JSON rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphOptions {
    /// Pretty-print with indentation.
    pub pretty: bool,
    /// Schema version stamped into `metadata.schema_version`.
    pub schema_version: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            schema_version: 1,
        }
    }
}

/// One vertex: either a section header or a content block. Entities
/// (document-level named concepts) are left empty here — out of scope
/// without an entity-extraction processor — but the key is always present
/// so downstream loaders don't need to special-case its absence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphVertex {
    /// The block id, used as the vertex key.
    #[serde(rename = "_key")]
    pub key: String,
    /// The block's kind slug (`"text"`, `"table"`, …).
    #[serde(rename = "type")]
    pub kind: String,
    /// Plain-text content, when non-empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Section level, for `section_header` vertices only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}

/// One edge: `_from`/`_to` reference vertex keys, `_type` names the relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    #[serde(rename = "_from")]
    pub from: String,
    #[serde(rename = "_to")]
    pub to: String,
    #[serde(rename = "_type")]
    pub edge_type: String,
}

/// Renders a [`Document`] as the flat graph-store-friendly projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GraphSerializer {
    options: GraphOptions,
}

impl GraphSerializer {
    /// Creates a serializer with default options.
    #[must_use = "creates a new serializer"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a serializer with the given options.
    #[must_use = "creates a new serializer"]
    pub const fn with_options(options: GraphOptions) -> Self {
        Self { options }
    }

    /// Renders `doc` to a `serde_json::Value` in the §6 graph shape.
    #[must_use = "returns the rendered document value"]
    pub fn to_value(&self, doc: &Document) -> Value {
        let blocks = doc.iter(crate::document::KindFilter::Any, true);

        let sections: Vec<GraphVertex> = blocks
            .iter()
            .filter(|b| b.kind == Kind::SectionHeader)
            .map(|b| vertex_of(b))
            .collect();
        let content_blocks: Vec<GraphVertex> = blocks
            .iter()
            .filter(|b| b.kind != Kind::SectionHeader)
            .map(|b| vertex_of(b))
            .collect();

        let mut contains = Vec::new();
        let mut references = Vec::new();
        let relates_to: Vec<GraphEdge> = Vec::new();

        for block in &blocks {
            for child in &block.children {
                contains.push(GraphEdge {
                    from: block.id.0.clone(),
                    to: child.0.clone(),
                    edge_type: "contains".to_string(),
                });
            }
            for structure_ref in &block.structure_refs {
                references.push(GraphEdge {
                    from: block.id.0.clone(),
                    to: structure_ref.0.clone(),
                    edge_type: "references".to_string(),
                });
            }
        }

        json!({
            "vertices": {
                "documents": [{ "_key": "0_document_0" }],
                "sections": sections,
                "blocks": content_blocks,
                "entities": Vec::<Value>::new(),
            },
            "edges": {
                "contains": contains,
                "references": references,
                "relates_to": relates_to,
            },
            "metadata": {
                "source_file": doc.metadata.source_format,
                "processing_time": doc.metadata.processing_time_ms,
                "schema_version": self.options.schema_version,
            }
        })
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

fn vertex_of(block: &Block) -> GraphVertex {
    GraphVertex {
        key: block.id.0.clone(),
        kind: block.kind.slug().to_string(),
        text: (!block.text.is_empty()).then(|| block.text.clone()),
        level: block.section_level(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockId, BreadcrumbEntry, TextExtractionMethod};
    use crate::document::{DocumentMetadata, Page};
    use crate::geometry::{Polygon, Size};

    fn sample_doc() -> Document {
        let mut doc = Document::new(DocumentMetadata::default());
        let header = Block::new(
            BlockId::new(1, Kind::SectionHeader, 0),
            Kind::SectionHeader,
            Polygon::from_rect(0.0, 0.0, 100.0, 20.0),
            1,
        )
        .with_text("Intro")
        .with_payload(BlockPayload::SectionHeader {
            level: 1,
            breadcrumb: vec![BreadcrumbEntry {
                level: 1,
                title: "Intro".into(),
                hash: 42,
            }],
        });
        let child = Block::new(
            BlockId::new(1, Kind::Text, 0),
            Kind::Text,
            Polygon::from_rect(0.0, 25.0, 100.0, 45.0),
            1,
        )
        .with_text("body")
        .with_extraction_method(TextExtractionMethod::Native);
        let header_id = doc.register_block(header).unwrap();
        let child_id = doc.register_block(child).unwrap();
        doc.get_mut(&header_id).unwrap().children.push(child_id.clone());
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(612.0, 792.0),
            top_level_blocks: vec![header_id],
            raster_ref: None,
        });
        doc
    }

    #[test]
    fn sections_and_blocks_are_partitioned() {
        let doc = sample_doc();
        let value = GraphSerializer::new().to_value(&doc);
        assert_eq!(value["vertices"]["sections"].as_array().unwrap().len(), 1);
        assert_eq!(value["vertices"]["blocks"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn contains_edge_links_header_to_child() {
        let doc = sample_doc();
        let value = GraphSerializer::new().to_value(&doc);
        let contains = value["edges"]["contains"].as_array().unwrap();
        assert_eq!(contains.len(), 1);
        assert_eq!(contains[0]["_from"], json!("1_section_header_0"));
        assert_eq!(contains[0]["_to"], json!("1_text_0"));
    }

    #[test]
    fn metadata_carries_schema_version() {
        let doc = sample_doc();
        let value = GraphSerializer::new().to_value(&doc);
        assert_eq!(value["metadata"]["schema_version"], json!(1));
    }
}
