//! GitHub-Flavored Markdown renderer (§4.9, §6).
//!
//! Walks each page's top-level blocks depth-first, in document order,
//! projecting `SectionHeader` to `#`..`######`, `Code` to a fenced block
//! carrying the detected `language`, `Table` to a GFM pipe table, and
//! `ListGroup`/`ListItem` to `-`/`1.` list items. Like [`crate::serializer::json`],
//! this is a pure projection: it borrows the `Document` and never mutates it.

use crate::block::{Block, BlockPayload, Kind};
use crate::document::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_width::UnicodeWidthStr;

static UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_").unwrap());

/// Configuration options for markdown serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkdownOptions {
    /// Number of spaces for list indentation.
    pub indent: usize,
    /// Whether to escape underscores in body text, to prevent accidental
    /// italic formatting (default `true`).
    pub escape_underscores: bool,
    /// Include blocks marked `removed` (tombstones). Default `false`,
    /// matching renderers' contract to ignore them (invariant 7).
    pub include_removed: bool,
    /// Insert `<!-- page N -->` comments between pages. Default `false`.
    pub insert_page_breaks: bool,
    /// Encode each `SectionHeader`'s breadcrumb as a trailing HTML comment
    /// (`<!-- breadcrumb: A > B > C -->`) for downstream tooling that wants
    /// the hierarchy without re-deriving it. Default `false`.
    pub emit_breadcrumb_comments: bool,
}

impl Default for MarkdownOptions {
    #[inline]
    fn default() -> Self {
        Self {
            indent: 4,
            escape_underscores: true,
            include_removed: false,
            insert_page_breaks: false,
            emit_breadcrumb_comments: false,
        }
    }
}

/// Renders a [`Document`] as GFM Markdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MarkdownSerializer {
    options: MarkdownOptions,
}

impl MarkdownSerializer {
    /// Creates a serializer with default options.
    #[must_use = "creates a new serializer"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a serializer with the given options.
    #[must_use = "creates a new serializer"]
    pub const fn with_options(options: MarkdownOptions) -> Self {
        Self { options }
    }

    /// Renders `doc` to a Markdown string.
    #[must_use = "returns the rendered markdown"]
    pub fn serialize(&self, doc: &Document) -> String {
        let mut out = String::new();
        for page in &doc.pages {
            if self.options.insert_page_breaks && page.page_no > 1 {
                out.push_str(&format!("<!-- page {} -->\n\n", page.page_no));
            }
            for id in &page.top_level_blocks {
                let Ok(block) = doc.get(id) else { continue };
                if block.removed && !self.options.include_removed {
                    continue;
                }
                self.render_block(doc, block, 0, &mut out);
            }
        }
        trim_trailing_blank_lines(&mut out);
        out
    }

    fn render_block(&self, doc: &Document, block: &Block, depth: usize, out: &mut String) {
        if block.removed && !self.options.include_removed {
            return;
        }
        match block.kind {
            Kind::SectionHeader => self.render_section_header(doc, block, out),
            Kind::Text | Kind::Footnote | Kind::Caption => self.render_paragraph(block, out),
            Kind::Code => self.render_code(block, out),
            Kind::Table => self.render_table(block, out),
            Kind::ListGroup => self.render_list_group(doc, block, depth, out),
            Kind::ListItem => self.render_list_item(doc, block, depth, out),
            Kind::Equation => self.render_equation(block, out),
            Kind::Reference => self.render_paragraph(block, out),
            Kind::Figure | Kind::Picture => self.render_figure(block, out),
            Kind::PageHeader | Kind::PageFooter => {}
            _ => self.render_children_only(doc, block, depth, out),
        }
    }

    fn render_children_only(&self, doc: &Document, block: &Block, depth: usize, out: &mut String) {
        for child_id in &block.children {
            if let Ok(child) = doc.get(child_id) {
                self.render_block(doc, child, depth, out);
            }
        }
    }

    fn render_section_header(&self, doc: &Document, block: &Block, out: &mut String) {
        let level = block.section_level().unwrap_or(1).clamp(1, 6);
        out.push_str(&"#".repeat(level as usize));
        out.push(' ');
        out.push_str(&self.escape(&block.text));
        if self.options.emit_breadcrumb_comments {
            if let BlockPayload::SectionHeader { breadcrumb, .. } = &block.payload {
                if !breadcrumb.is_empty() {
                    let trail = breadcrumb.iter().map(|e| e.title.as_str()).collect::<Vec<_>>().join(" > ");
                    out.push_str(&format!(" <!-- breadcrumb: {trail} -->"));
                }
            }
        }
        out.push_str("\n\n");
        for child_id in &block.children {
            if let Ok(child) = doc.get(child_id) {
                self.render_block(doc, child, 0, out);
            }
        }
    }

    fn render_paragraph(&self, block: &Block, out: &mut String) {
        if block.text.trim().is_empty() {
            return;
        }
        out.push_str(&self.escape(&block.text));
        out.push_str("\n\n");
    }

    fn render_equation(&self, block: &Block, out: &mut String) {
        out.push_str("$$\n");
        out.push_str(block.text.trim());
        out.push_str("\n$$\n\n");
    }

    fn render_figure(&self, block: &Block, out: &mut String) {
        let alt = if block.text.is_empty() { "figure" } else { block.text.as_str() };
        out.push_str(&format!("![{alt}]({})\n\n", block.id.0));
    }

    fn render_code(&self, block: &Block, out: &mut String) {
        let language = match &block.payload {
            BlockPayload::Code { language, .. } => language.clone().unwrap_or_default(),
            _ => String::new(),
        };
        out.push_str("```");
        out.push_str(&language);
        out.push('\n');
        out.push_str(&block.text);
        if !block.text.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n\n");
    }

    fn render_list_group(&self, doc: &Document, block: &Block, depth: usize, out: &mut String) {
        for child_id in &block.children {
            if let Ok(child) = doc.get(child_id) {
                if child.kind == Kind::ListItem {
                    self.render_list_item(doc, child, depth, out);
                } else {
                    self.render_block(doc, child, depth, out);
                }
            }
        }
        out.push('\n');
    }

    fn render_list_item(&self, doc: &Document, block: &Block, depth: usize, out: &mut String) {
        let pad = " ".repeat(depth * self.options.indent);
        out.push_str(&pad);
        out.push_str("- ");
        out.push_str(&self.escape(block.text.trim()));
        out.push('\n');
        for child_id in &block.children {
            if let Ok(child) = doc.get(child_id) {
                if child.kind == Kind::ListGroup {
                    self.render_list_group(doc, child, depth + 1, out);
                } else {
                    self.render_block(doc, child, depth + 1, out);
                }
            }
        }
    }

    fn render_table(&self, block: &Block, out: &mut String) {
        let BlockPayload::Table { rows, cols, cells, .. } = &block.payload else {
            return;
        };
        if *rows == 0 || *cols == 0 {
            return;
        }
        let mut grid: Vec<Vec<String>> = vec![vec![String::new(); *cols]; *rows];
        for cell in cells {
            if cell.row_index < *rows && cell.col_index < *cols {
                grid[cell.row_index][cell.col_index] = cell.text.replace('|', "\\|").replace('\n', " ");
            }
        }

        // Column display width (CJK and other double-width glyphs count as 2),
        // so pipes line up in a monospace viewer the way a human-typed table would.
        let mut col_widths = vec![0usize; *cols];
        for row in &grid {
            for (c, text) in row.iter().enumerate() {
                col_widths[c] = col_widths[c].max(text.width());
            }
        }

        // A column renders right-aligned when every data row (all rows after
        // the header) parses as a number; this mirrors how spreadsheet-derived
        // tables are usually typeset.
        let mut col_is_numeric = vec![false; *cols];
        if grid.len() > 1 {
            for c in 0..*cols {
                col_is_numeric[c] = grid[1..].iter().all(|row| {
                    let text = row[c].trim();
                    !text.is_empty() && text.parse::<f64>().is_ok()
                });
            }
        }

        for (r, row) in grid.iter().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(c, text)| {
                    let pad = col_widths[c] - text.width();
                    if col_is_numeric[c] {
                        format!("{}{}", " ".repeat(pad), text)
                    } else {
                        format!("{}{}", text, " ".repeat(pad))
                    }
                })
                .collect();
            out.push_str("| ");
            out.push_str(&cells.join(" | "));
            out.push_str(" |\n");
            if r == 0 {
                let seps: Vec<String> = col_widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
                out.push_str("| ");
                out.push_str(&seps.join(" | "));
                out.push_str(" |\n");
            }
        }
        out.push('\n');
    }

    fn escape(&self, text: &str) -> String {
        if self.options.escape_underscores {
            UNDERSCORE.replace_all(text, r"\_").into_owned()
        } else {
            text.to_string()
        }
    }
}

fn trim_trailing_blank_lines(out: &mut String) {
    while out.ends_with("\n\n\n") {
        out.pop();
    }
    while out.ends_with('\n') && !out.ends_with("\n\n") {
        out.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockId, TableCell, TableExtractionMethod, TableMetadata, TextExtractionMethod};
    use crate::document::{DocumentMetadata, Page};
    use crate::geometry::{Polygon, Size};
    use crate::QualityBreakdown;

    fn header(text: &str, level: u8, id: &str) -> Block {
        Block::new(id.into(), Kind::SectionHeader, Polygon::from_rect(0.0, 0.0, 100.0, 20.0), 1)
            .with_text(text)
            .with_payload(BlockPayload::SectionHeader { level, breadcrumb: vec![] })
    }

    fn paragraph(text: &str, id: &str) -> Block {
        Block::new(id.into(), Kind::Text, Polygon::from_rect(0.0, 25.0, 100.0, 45.0), 1)
            .with_text(text)
            .with_extraction_method(TextExtractionMethod::Native)
    }

    #[test]
    fn renders_header_then_paragraph() {
        let mut doc = Document::new(DocumentMetadata::default());
        let h = doc.register_block(header("Intro", 1, "1_section_header_0")).unwrap();
        let p = doc.register_block(paragraph("body text", "1_text_0")).unwrap();
        doc.get_mut(&h).unwrap().children.push(p);
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(612.0, 792.0),
            top_level_blocks: vec![h],
            raster_ref: None,
        });
        let md = MarkdownSerializer::new().serialize(&doc);
        assert!(md.starts_with("# Intro\n\n"));
        assert!(md.contains("body text"));
    }

    #[test]
    fn underscore_escaping_is_opt_out() {
        let mut doc = Document::new(DocumentMetadata::default());
        let p = doc.register_block(paragraph("snake_case_name", "1_text_0")).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::default(),
            top_level_blocks: vec![p],
            raster_ref: None,
        });
        let escaped = MarkdownSerializer::new().serialize(&doc);
        assert!(escaped.contains(r"snake\_case\_name"));

        let unescaped = MarkdownSerializer::with_options(MarkdownOptions {
            escape_underscores: false,
            ..MarkdownOptions::default()
        })
        .serialize(&doc);
        assert!(unescaped.contains("snake_case_name"));
    }

    #[test]
    fn renders_code_fence_with_language() {
        let mut doc = Document::new(DocumentMetadata::default());
        let code = Block::new(BlockId::new(1, Kind::Code, 0), Kind::Code, Polygon::from_rect(0.0, 0.0, 100.0, 20.0), 1)
            .with_text("fn main() {}\n")
            .with_payload(BlockPayload::Code {
                language: Some("rust".into()),
                language_confidence: 0.95,
            });
        let id = doc.register_block(code).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::default(),
            top_level_blocks: vec![id],
            raster_ref: None,
        });
        let md = MarkdownSerializer::new().serialize(&doc);
        assert!(md.contains("```rust\nfn main() {}\n```"));
    }

    #[test]
    fn renders_table_as_gfm_pipe_table() {
        let mut doc = Document::new(DocumentMetadata::default());
        let table = Block::new(BlockId::new(1, Kind::Table, 0), Kind::Table, Polygon::from_rect(0.0, 0.0, 100.0, 40.0), 1)
            .with_payload(BlockPayload::Table {
                rows: 2,
                cols: 2,
                cells: vec![
                    TableCell::new(0, 0, "Name"),
                    TableCell::new(0, 1, "Age"),
                    TableCell::new(1, 0, "Ada"),
                    TableCell::new(1, 1, "36"),
                ],
                metadata: TableMetadata {
                    extraction_method: TableExtractionMethod::HeuristicA,
                    quality_score: 0.9,
                    quality_breakdown: QualityBreakdown {
                        structure: 1.0,
                        content: 1.0,
                        alignment: 1.0,
                        whitespace: 1.0,
                    },
                    merge_info: None,
                    degraded: false,
                    parameters: None,
                },
            });
        let id = doc.register_block(table).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::default(),
            top_level_blocks: vec![id],
            raster_ref: None,
        });
        let md = MarkdownSerializer::new().serialize(&doc);
        assert!(md.contains("| Name | Age |"));
        assert!(md.contains("| ---- | --- |"));
        // The "Age" column is all-numeric in its data rows, so it's right-aligned
        // and "Name" pads out to the widest entry in its own column ("Ada").
        assert!(md.contains("| Ada  |  36 |"));
    }

    #[test]
    fn numeric_columns_are_right_aligned_and_widened_for_cjk() {
        let mut doc = Document::new(DocumentMetadata::default());
        let table = Block::new(BlockId::new(1, Kind::Table, 0), Kind::Table, Polygon::from_rect(0.0, 0.0, 100.0, 60.0), 1)
            .with_payload(BlockPayload::Table {
                rows: 3,
                cols: 2,
                cells: vec![
                    TableCell::new(0, 0, "城市"),
                    TableCell::new(0, 1, "Count"),
                    TableCell::new(1, 0, "Tokyo"),
                    TableCell::new(1, 1, "1"),
                    TableCell::new(2, 0, "Osaka"),
                    TableCell::new(2, 1, "23"),
                ],
                metadata: TableMetadata {
                    extraction_method: TableExtractionMethod::HeuristicA,
                    quality_score: 0.9,
                    quality_breakdown: QualityBreakdown {
                        structure: 1.0,
                        content: 1.0,
                        alignment: 1.0,
                        whitespace: 1.0,
                    },
                    merge_info: None,
                    degraded: false,
                    parameters: None,
                },
            });
        let id = doc.register_block(table).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::default(),
            top_level_blocks: vec![id],
            raster_ref: None,
        });
        let md = MarkdownSerializer::new().serialize(&doc);
        // "城市" occupies 4 display columns (2 double-width glyphs), wider than
        // "Tokyo"/"Osaka", so the first column's separator must be 5 dashes.
        assert!(md.contains("-----"));
        // The numeric column right-aligns "1" against the wider "23".
        assert!(md.contains(" 1 |"));
    }

    #[test]
    fn removed_blocks_are_skipped() {
        let mut doc = Document::new(DocumentMetadata::default());
        let mut block = paragraph("gone", "1_text_0");
        block.removed = true;
        let id = doc.register_block(block).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::default(),
            top_level_blocks: vec![id],
            raster_ref: None,
        });
        let md = MarkdownSerializer::new().serialize(&doc);
        assert!(!md.contains("gone"));
    }
}
