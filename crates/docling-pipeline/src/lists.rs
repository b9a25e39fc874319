//! List detection and grouping (§4.8).
//!
//! Items already tagged `ListItem` by the provider, plus `Text` blocks
//! matching a numbered/bulleted glyph pattern, are promoted/kept as
//! `ListItem`; consecutive top-level runs of them are then grouped under a
//! single `ListGroup` container, the one §4.8 container kind the closed
//! `Kind` enumeration already carries.

use once_cell::sync::Lazy;
use regex::Regex;

use docling_core::{Block, BlockId, Document, Kind, KindFilter, PipelineConfig, Result};

use crate::cancellation::CancellationToken;
use crate::processor::Processor;

/// Matches a leading list-item glyph: `1.`, `1)`, `a.`, `-`, `*`, `•`, `◦`.
static LIST_GLYPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[0-9]{1,3}[.)]|[a-zA-Z][.)]|[-*•◦‣])\s+\S").unwrap()
});

/// The list-detection-and-grouping processor (§4.8).
pub struct ListsProcessor;

impl Processor for ListsProcessor {
    fn name(&self) -> &'static str {
        "lists"
    }

    fn kinds(&self) -> KindFilter {
        vec![Kind::Text, Kind::ListItem].into()
    }

    fn run(&self, doc: &mut Document, _config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
        for page_no in 0..doc.pages.len() {
            if token.is_cancelled() {
                return Ok(());
            }
            promote_list_items(doc, page_no)?;
            group_list_items(doc, page_no)?;
        }
        Ok(())
    }
}

/// Reclassifies top-level `Text` blocks whose text opens with a list glyph
/// as `ListItem`, in place (no new id minted, matching the header/footer
/// reclassification in `text_layout`).
fn promote_list_items(doc: &mut Document, page_no: usize) -> Result<()> {
    let ids = doc.pages[page_no].top_level_blocks.clone();
    for id in ids {
        let block = doc.get(&id)?;
        if block.kind == Kind::Text && !block.removed && LIST_GLYPH.is_match(&block.text) {
            doc.get_mut(&id)?.kind = Kind::ListItem;
        }
    }
    Ok(())
}

/// Groups consecutive top-level `ListItem`s into one `ListGroup` container
/// per run, mirroring `table::merge`'s approach of splicing a single
/// synthesized block into the page's top-level slot a contiguous run
/// occupied. A run of length one still gets wrapped, so every list item
/// ends up with a `ListGroup` parent regardless of how many siblings it has.
fn group_list_items(doc: &mut Document, page_no: usize) -> Result<()> {
    let top_level = doc.pages[page_no].top_level_blocks.clone();
    let mut new_top_level: Vec<BlockId> = Vec::with_capacity(top_level.len());
    let mut run: Vec<BlockId> = Vec::new();

    let flush = |doc: &mut Document, run: &mut Vec<BlockId>, out: &mut Vec<BlockId>| -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        let items: Vec<Block> = run.iter().map(|id| doc.get(id).cloned()).collect::<Result<_>>()?;
        let polygon = union_polygon(items.iter().map(|b| b.polygon));
        let new_id = doc.mint_id(page_no, Kind::ListGroup);
        let mut group = Block::new(new_id.clone(), Kind::ListGroup, polygon, page_no);
        group.children = run.clone();
        doc.register_block(group)?;
        out.push(new_id);
        run.clear();
        Ok(())
    };

    for id in top_level {
        let is_item = doc.get(&id)?.kind == Kind::ListItem && !doc.get(&id)?.removed;
        if is_item {
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
