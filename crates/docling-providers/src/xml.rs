//! XML provider (§4.2, §6): walks a generic, well-formed XML tree with
//! `roxmltree`, the same way [`crate::html::HtmlProvider`] walks a `scraper`
//! DOM. Arbitrary XML carries no universal document schema, so this provider
//! recognizes the structural conventions common to article/manuscript XML
//! (JATS-like `<sec>`/`<title>`/`<p>` nesting) and falls back to treating any
//! other leaf element's text as a paragraph — "preserve element nesting in
//! XML" (§4.2) without requiring a specific schema.

use docling_core::{
    Block, BlockPayload, Document, DocumentMetadata, InputFormat, Kind, Page, Polygon, Result, Size,
    TextExtractionMethod,
};
use roxmltree::Node;

use crate::Provider;

const PAGE_SIZE: Size = Size::new(612.0, 792.0);
const ROW_HEIGHT: f64 = 20.0;

enum ContentNode {
    Heading { level: u8, text: String },
    Paragraph(String),
}

fn is_section_wrapper(tag: &str) -> bool {
    matches!(tag.to_ascii_lowercase().as_str(), "sec" | "section" | "div" | "div1" | "div2" | "chapter" | "body")
}

fn heading_level_from_tag(tag: &str) -> Option<u8> {
    tag.to_ascii_lowercase().strip_prefix('h')?.parse::<u8>().ok().filter(|n| (1..=6).contains(n))
}

fn is_heading_tag(tag: &str) -> bool {
    matches!(tag.to_ascii_lowercase().as_str(), "title" | "head" | "heading") || heading_level_from_tag(tag).is_some()
}

fn is_paragraph_tag(tag: &str) -> bool {
    matches!(tag.to_ascii_lowercase().as_str(), "p" | "para" | "paragraph")
}

/// Concatenates every text node under `node` (including `node` itself),
/// then collapses whitespace. Good enough for leaf-ish elements (headings,
/// paragraphs) where nested markup is purely inline.
fn collect_text(node: Node) -> String {
    let mut buf = String::new();
    for descendant in node.descendants().filter(Node::is_text) {
        if let Some(text) = descendant.text() {
            buf.push_str(text);
            buf.push(' ');
        }
    }
    buf.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recursively walks `node`'s children, appending [`ContentNode`]s in
/// document order. `section_depth` tracks how many `<sec>`-like ancestors
/// have been crossed, giving nested titles an increasing heading level.
fn walk(node: Node, section_depth: usize, out: &mut Vec<ContentNode>) {
    for child in node.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        if is_section_wrapper(tag) {
            walk(child, section_depth + 1, out);
            continue;
        }
        if is_heading_tag(tag) {
            let text = collect_text(child);
            if !text.is_empty() {
                let level = heading_level_from_tag(tag).unwrap_or_else(|| section_depth.clamp(1, 6) as u8);
                out.push(ContentNode::Heading { level, text });
            }
            continue;
        }
        if is_paragraph_tag(tag) {
            let text = collect_text(child);
            if !text.is_empty() {
                out.push(ContentNode::Paragraph(text));
            }
            continue;
        }
        if !child.children().any(Node::is_element) {
            let text = collect_text(child);
            if !text.is_empty() {
                out.push(ContentNode::Paragraph(text));
            }
        } else {
            walk(child, section_depth, out);
        }
    }
}

/// Parses XML via `roxmltree` and builds a single-page `Document`.
pub struct XmlProvider;

impl XmlProvider {
    /// Creates a new XML provider.
    #[must_use = "creates a new provider"]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for XmlProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for XmlProvider {
    fn format(&self) -> InputFormat {
        InputFormat::Xml
    }

    fn parse_bytes(&self, bytes: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| docling_core::DoclingError::CorruptedInput(format!("invalid UTF-8: {e}")))?;
        let tree = roxmltree::Document::parse(text)
            .map_err(|e| docling_core::DoclingError::CorruptedInput(format!("malformed XML: {e}")))?;

        let root = tree.root_element();
        let title = root
            .children()
            .find(|c| is_heading_tag(c.tag_name().name()))
            .map(collect_text)
            .filter(|s| !s.is_empty());

        let mut nodes = Vec::new();
        walk(root, 0, &mut nodes);

        let mut doc = Document::new(DocumentMetadata {
            title,
            source_format: Some(InputFormat::Xml),
            ..DocumentMetadata::default()
        });

        let mut top_level = Vec::with_capacity(nodes.len());
        let mut y = 0.0_f64;
        for node in nodes {
            let id = register_content_node(&mut doc, node, &mut y);
            top_level.push(id);
        }

        doc.add_page(Page {
            page_no: 1,
            size: PAGE_SIZE,
            top_level_blocks: top_level,
            raster_ref: None,
        });
        Ok(doc)
    }
}

fn register_content_node(doc: &mut Document, node: ContentNode, y: &mut f64) -> docling_core::BlockId {
    match node {
        ContentNode::Heading { level, text } => {
            let id = doc.mint_id(1, Kind::SectionHeader);
            let top = *y;
            *y += ROW_HEIGHT;
            let block = Block::new(id.clone(), Kind::SectionHeader, Polygon::from_rect(0.0, top, 500.0, *y), 1)
                .with_text(text)
                .with_extraction_method(TextExtractionMethod::Native)
                .with_payload(BlockPayload::SectionHeader { level, breadcrumb: Vec::new() });
            doc.register_block(block).expect("fresh document never rejects registration");
            id
        }
        ContentNode::Paragraph(text) => {
            let id = doc.mint_id(1, Kind::Text);
            let top = *y;
            *y += ROW_HEIGHT;
            let block = Block::new(id.clone(), Kind::Text, Polygon::from_rect(0.0, top, 500.0, *y), 1)
                .with_text(text)
                .with_extraction_method(TextExtractionMethod::Native);
            doc.register_block(block).expect("fresh document never rejects registration");
            id
        }
    }
}
