//! Reference (bibliography entry) detection and grouping (§4.8).
//!
//! A `Text` block opening with a reference-style token (`[12]`, `12.`, or a
//! bare numeric citation marker followed by author-like text) is
//! reclassified to `Reference`. Unlike equations, a run of references is a
//! *list of distinct entries*, not one logical unit to merge — each entry
//! keeps its own block and text. `Kind` has no "ReferenceList" container, so
//! grouping is recorded the way a table's constituent cells are: the first
//! entry in a contiguous run carries `structure_refs` pointing at the rest,
//! leaving every entry independently addressable and renderable.

use once_cell::sync::Lazy;
use regex::Regex;

use docling_core::{Document, Kind, KindFilter, PipelineConfig, Result};

use crate::cancellation::CancellationToken;
use crate::processor::Processor;

/// Matches a leading bracketed or numbered citation marker: `[12]`, `12.`,
/// `(3)`.
static REFERENCE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\[[0-9]{1,4}\]|\([0-9]{1,4}\)|[0-9]{1,4}[.)])\s+\S").unwrap()
});

/// The reference-detection-and-grouping processor (§4.8).
pub struct ReferencesProcessor;

impl Processor for ReferencesProcessor {
    fn name(&self) -> &'static str {
        "references"
    }

    fn kinds(&self) -> KindFilter {
        vec![Kind::Text, Kind::Reference].into()
    }

    fn run(&self, doc: &mut Document, _config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
        for page_no in 0..doc.pages.len() {
            if token.is_cancelled() {
                return Ok(());
            }
            promote_references(doc, page_no)?;
            link_reference_runs(doc, page_no)?;
        }
        Ok(())
    }
}

/// Reclassifies top-level `Text` blocks matching the citation-marker pattern
/// to `Reference`, in place.
fn promote_references(doc: &mut Document, page_no: usize) -> Result<()> {
    let ids = doc.pages[page_no].top_level_blocks.clone();
    for id in ids {
        let block = doc.get(&id)?;
        if block.kind == Kind::Text && !block.removed && REFERENCE_MARKER.is_match(&block.text) {
            doc.get_mut(&id)?.kind = Kind::Reference;
        }
    }
    Ok(())
}

/// Links each contiguous top-level run of `Reference` blocks by recording
/// the run's trailing members on the first entry's `structure_refs`. No
/// blocks are merged or tombstoned — every entry stays independently
/// addressable, only the first one additionally carries the list's span.
fn link_reference_runs(doc: &mut Document, page_no: usize) -> Result<()> {
    let top_level = doc.pages[page_no].top_level_blocks.clone();
    let mut run = Vec::new();

    for id in &top_level {
        let block = doc.get(id)?;
        if block.kind == Kind::Reference && !block.removed {
            run.push(id.clone());
        } else {
            flush_run(doc, &run)?;
            run.clear();
        }
    }
    flush_run(doc, &run)?;
    Ok(())
}

fn flush_run(doc: &mut Document, run: &[docling_core::BlockId]) -> Result<()> {
    if run.len() < 2 {
        return Ok(());
    }
    let first = doc.get_mut(&run[0])?;
    first.structure_refs = run[1..].to_vec();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::{Block, BlockId as CoreBlockId, DocumentMetadata, Page, Polygon, Size, TextExtractionMethod};

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
    fn bracketed_citations_promote_and_link() {
        let mut doc = doc_with(vec![
            text_block(0, "[1] Smith, J. Some Paper. 2020.", 10.0),
            text_block(1, "[2] Doe, A. Another Paper. 2021.", 30.0),
        ]);
        let config = PipelineConfig::default();
        ReferencesProcessor.run(&mut doc, &config, &CancellationToken::new()).unwrap();

        assert_eq!(doc.pages[0].top_level_blocks.len(), 2);
        let first = doc.get(&doc.pages[0].top_level_blocks[0]).unwrap();
        assert_eq!(first.kind, Kind::Reference);
        assert_eq!(first.structure_refs.len(), 1);
        let second = doc.get(&doc.pages[0].top_level_blocks[1]).unwrap();
        assert_eq!(second.kind, Kind::Reference);
        assert!(second.structure_refs.is_empty());
    }

    #[test]
    fn lone_reference_gets_no_structure_refs() {
        let mut doc = doc_with(vec![text_block(0, "[1] Smith, J. Some Paper. 2020.", 10.0)]);
        let config = PipelineConfig::default();
        ReferencesProcessor.run(&mut doc, &config, &CancellationToken::new()).unwrap();
        let only = doc.get(&doc.pages[0].top_level_blocks[0]).unwrap();
        assert_eq!(only.kind, Kind::Reference);
        assert!(only.structure_refs.is_empty());
    }

    #[test]
    fn ordinary_prose_is_left_as_text() {
        let mut doc = doc_with(vec![text_block(0, "This paragraph cites nothing in particular.", 10.0)]);
        let config = PipelineConfig::default();
        ReferencesProcessor.run(&mut doc, &config, &CancellationToken::new()).unwrap();
        let only = doc.get(&doc.pages[0].top_level_blocks[0]).unwrap();
        assert_eq!(only.kind, Kind::Text);
    }
}
