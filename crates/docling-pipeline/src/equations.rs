//! Equation detection and grouping (§4.8).
//!
//! A `Text` block delimited by `\[ … \]` or `$$ … $$` is reclassified to
//! `Equation`; consecutive top-level runs of `Equation` blocks — typically
//! one display equation split across several OCR lines — are merged into a
//! single synthesized `Equation` block, the same way `text_layout::join_paragraphs`
//! merges `Line` runs into one `Text` block. `Kind` has no dedicated
//! "EquationGroup" container, so the merged block's `structure_refs` records
//! the original members (tombstoned, per invariant 7) instead.

use once_cell::sync::Lazy;
use regex::Regex;

use docling_core::{Block, BlockId, Document, Kind, KindFilter, PipelineConfig, Result};

use crate::cancellation::CancellationToken;
use crate::processor::Processor;

/// Matches `\[ ... \]` or `$$ ... $$` display-equation delimiters, anchored
/// to the whole (trimmed) block text rather than a substring, so a
/// paragraph that merely mentions a formula inline isn't reclassified.
static EQUATION_DELIMITERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\\\[.*\\\]|\$\$.*\$\$)\s*$").unwrap()
});

/// The equation-detection-and-grouping processor (§4.8).
pub struct EquationsProcessor;

impl Processor for EquationsProcessor {
    fn name(&self) -> &'static str {
        "equations"
    }

    fn kinds(&self) -> KindFilter {
        vec![Kind::Text, Kind::Equation].into()
    }

    fn run(&self, doc: &mut Document, _config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
        for page_no in 0..doc.pages.len() {
            if token.is_cancelled() {
                return Ok(());
            }
            promote_equations(doc, page_no)?;
            merge_equation_runs(doc, page_no)?;
        }
        Ok(())
    }
}

/// Reclassifies top-level `Text` blocks matching the delimiter pattern to
/// `Equation`, in place.
fn promote_equations(doc: &mut Document, page_no: usize) -> Result<()> {
    let ids = doc.pages[page_no].top_level_blocks.clone();
    for id in ids {
        let block = doc.get(&id)?;
        if block.kind == Kind::Text && !block.removed && EQUATION_DELIMITERS.is_match(block.text.trim()) {
            doc.get_mut(&id)?.kind = Kind::Equation;
        }
    }
    Ok(())
}

/// Merges consecutive top-level `Equation` blocks into one, normalizing
/// inner text by stripping the delimiters from interior members and joining
/// with a single space, per §4.8's "normalize inner text".
fn merge_equation_runs(doc: &mut Document, page_no: usize) -> Result<()> {
    let top_level = doc.pages[page_no].top_level_blocks.clone();
    let mut new_top_level: Vec<BlockId> = Vec::with_capacity(top_level.len());
    let mut run: Vec<BlockId> = Vec::new();

    let flush = |doc: &mut Document, run: &mut Vec<BlockId>, out: &mut Vec<BlockId>| -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        if run.len() == 1 {
            out.push(run[0].clone());
        } else {
            let members: Vec<Block> = run.iter().map(|id| doc.get(id).cloned()).collect::<Result<_>>()?;
            let joined_text = members.iter().map(|b| strip_delimiters(&b.text)).collect::<Vec<_>>().join(" ");
            let polygon = union_polygon(members.iter().map(|b| b.polygon));
            let method = members[0].text_extraction_method;
            let new_id = doc.mint_id(page_no, Kind::Equation);
            let mut merged = Block::new(new_id.clone(), Kind::Equation, polygon, page_no)
                .with_text(format!("\\[{joined_text}\\]"))
                .with_extraction_method(method);
            merged.structure_refs = run.clone();
            doc.register_block(merged)?;
            for id in run.iter() {
                doc.get_mut(id)?.removed = true;
            }
            out.push(new_id);
        }
        run.clear();
        Ok(())
    };

    for id in top_level {
        let is_equation = doc.get(&id)?.kind == Kind::Equation && !doc.get(&id)?.removed;
        if is_equation {
            run.push(id);
        } else {
            flush(doc, &mut run, &mut new_top_level)?;
            new_top_level.push(id);
        }
    }
    flush(doc, &mut run, &mut new_top_level)?;

    doc.pages[page_no].top_level_blocks = new_top_level;
    Ok(())
}

fn strip_delimiters(text: &str) -> String {
    text.trim()
        .trim_start_matches("\\[")
        .trim_end_matches("\\]")
        .trim_start_matches("$$")
        .trim_end_matches("$$")
        .trim()
        .to_string()
}

fn union_polygon(mut polys: impl Iterator<Item = docling_core::Polygon>) -> docling_core::Polygon {
    let first = polys.next().unwrap_or_else(|| docling_core::Polygon::from_rect(0.0, 0.0, 0.0, 0.0));
    let (mut l, mut t, mut r, mut b) = first.bounding_rect();
    for p in polys {
        let (pl, pt, pr, pb) = p.bounding_rect();
        l = l.min(pl);
        t = t.min(pt);
        r = r.max(pr);
        b = b.max(pb);
    }
    docling_core::Polygon::from_rect(l, t, r, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::{BlockId as CoreBlockId, DocumentMetadata, Page, Polygon, Size, TextExtractionMethod};

    fn text_block(counter: usize, text: &str, y: f64) -> Block {
        Block::new(CoreBlockId::new(1, Kind::Text, counter), Kind::Text, Polygon::from_rect(10.0, y, 200.0, y + 15.0), 1)
            .with_text(text)
            .with_extraction_method(TextExtractionMethod::Native)
    }

    fn doc_with(blocks: Vec<Block>) -> Document {
        let mut doc = Document::new(DocumentMetadata::default());
        let mut ids = Vec::new();
        for b in blocks {
            ids.push(doc.register_block(b).unwrap());
        }
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(612.0, 792.0),
            top_level_blocks: ids,
            raster_ref: None,
        });
        doc
    }

    #[test]
    fn bracket_delimited_text_promotes_to_equation() {
        let mut doc = doc_with(vec![text_block(0, r"\[ E = mc^2 \]", 10.0)]);
        let config = PipelineConfig::default();
        EquationsProcessor.run(&mut doc, &config, &CancellationToken::new()).unwrap();
        let id = &doc.pages[0].top_level_blocks[0];
        assert_eq!(doc.get(id).unwrap().kind, Kind::Equation);
    }

    #[test]
    fn prose_mentioning_dollar_signs_is_not_reclassified() {
        let mut doc = doc_with(vec![text_block(0, "The total was $$ after tax, not a formula.", 10.0)]);
        let config = PipelineConfig::default();
        EquationsProcessor.run(&mut doc, &config, &CancellationToken::new()).unwrap();
        let id = &doc.pages[0].top_level_blocks[0];
        assert_eq!(doc.get(id).unwrap().kind, Kind::Text);
    }

    #[test]
    fn multi_line_equation_merges_into_one_block_with_structure_refs() {
        let mut doc = doc_with(vec![
            text_block(0, r"\[ a + b", 10.0),
            text_block(1, r"= c \]", 30.0),
        ]);
        let config = PipelineConfig::default();
        // Neither line alone matches the anchored delimiter pattern once
        // split across lines, so pre-tag both as Equation the way a
        // provider's kind signal would.
        for id in doc.pages[0].top_level_blocks.clone() {
            doc.get_mut(&id).unwrap().kind = Kind::Equation;
        }
        EquationsProcessor.run(&mut doc, &config, &CancellationToken::new()).unwrap();

        assert_eq!(doc.pages[0].top_level_blocks.len(), 1);
        let merged = doc.get(&doc.pages[0].top_level_blocks[0]).unwrap();
        assert_eq!(merged.kind, Kind::Equation);
        assert_eq!(merged.structure_refs.len(), 2);
        assert!(merged.text.contains("a + b"));
        assert!(merged.text.contains("= c"));
    }
}
