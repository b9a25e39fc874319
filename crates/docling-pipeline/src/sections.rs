//! The Section Hierarchy Builder (§4.5): infers heading levels from detector
//! signals and numbering, enforces monotonicity, and attaches a breadcrumb to
//! every `SectionHeader` and, via the nearest preceding header, to every
//! content block.
//!
//! Level inference order, per §4.5:
//! 1. If a numbering prefix (`"1."`, `"1.2."`, `"A."`, `"Appendix A"`) is
//!    present on a majority of headers, numbering wins document-wide: a
//!    header's level is its numbering depth.
//! 2. Otherwise, distinct font sizes are clustered: the largest is level 1,
//!    next largest level 2, and so on, capped at 6.
//! 3. Headers with neither signal default to level 1 and are corrected by
//!    the monotonicity pass below.
//!
//! Monotonicity (`sections.monotonicity_policy`, default `demote`) then walks
//! headers in document order maintaining a level stack: a header whose raw
//! level would jump more than one past its nearest open ancestor is either
//! demoted to `ancestor + 1` or preceded by synthetic filler headers that
//! step through the missing levels, per policy.

use std::collections::HashSet;

use docling_core::{
    Block, BlockId, BlockPayload, BreadcrumbEntry, Document, Kind, KindFilter, MonotonicityPolicy,
    PipelineConfig, Polygon, Result, TextExtractionMethod,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::cancellation::CancellationToken;
use crate::processor::Processor;

/// The `section_hierarchy` processor (§4.5).
pub struct SectionHierarchyProcessor;

impl Processor for SectionHierarchyProcessor {
    fn name(&self) -> &'static str {
        "section_hierarchy"
    }

    fn kinds(&self) -> KindFilter {
        Kind::SectionHeader.into()
    }

    fn run(&self, doc: &mut Document, config: &PipelineConfig, _token: &CancellationToken) -> Result<()> {
        build_section_hierarchy(doc, config.sections.monotonicity_policy)
    }
}

static NUMERIC_DOTTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\.?\s").unwrap());
static LETTER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]\.\s").unwrap());
static APPENDIX_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^appendix\s+[a-z0-9]+\b").unwrap());

/// Numbering depth implied by a heading's leading numbering token, if any.
fn numbering_depth(text: &str) -> Option<usize> {
    let trimmed = text.trim_start();
    if let Some(caps) = NUMERIC_DOTTED.captures(trimmed) {
        let groups = caps.get(1)?.as_str();
        return Some(groups.split('.').count());
    }
    if LETTER_PREFIX.is_match(trimmed) || APPENDIX_PREFIX.is_match(trimmed) {
        return Some(1);
    }
    None
}

fn font_size_of(block: &Block) -> Option<f64> {
    block.metadata.get("font_size").and_then(serde_json::Value::as_f64)
}

/// Runs the full algorithm: collect headers in document order, infer raw
/// levels, enforce monotonicity, assign breadcrumbs, and propagate
/// breadcrumbs to content blocks.
fn build_section_hierarchy(doc: &mut Document, policy: MonotonicityPolicy) -> Result<()> {
    let headers: Vec<Block> = doc.iter(Kind::SectionHeader, true).into_iter().cloned().collect();
    if headers.is_empty() {
        return Ok(());
    }

    let with_numbering = headers
        .iter()
        .filter(|h| numbering_depth(&h.text).is_some())
        .count();
    let numbering_wins = with_numbering * 2 >= headers.len();

    let font_rank = if numbering_wins {
        None
    } else {
        Some(build_font_size_ranks(&headers))
    };

    let mut raw_levels: Vec<u8> = Vec::with_capacity(headers.len());
    let mut last_level: u8 = 1;
    for header in &headers {
        let level = if numbering_wins {
            numbering_depth(&header.text)
                .map(|d| d.clamp(1, 6) as u8)
                .unwrap_or(last_level)
        } else if let Some(size) = font_size_of(header) {
            font_rank
                .as_ref()
                .and_then(|ranks| ranks.iter().position(|&s| (s - size).abs() < f64::EPSILON))
                .map(|rank| (rank + 1).clamp(1, 6) as u8)
                .unwrap_or(1)
        } else {
            1
        };
        last_level = level;
        raw_levels.push(level);
    }

    let normalized = enforce_monotonicity(doc, &headers, &raw_levels, policy)?;
    assign_breadcrumbs(doc, &normalized)?;
    propagate_breadcrumbs_to_content(doc)?;
    Ok(())
}

/// Distinct font sizes among `headers`, sorted descending: index 0 is
/// level 1, index 1 is level 2, and so on (capped at 6 by the caller).
fn build_font_size_ranks(headers: &[Block]) -> Vec<f64> {
    let mut sizes: Vec<f64> = headers.iter().filter_map(font_size_of).collect();
    sizes.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    sizes.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
    sizes
}

/// One header in the (possibly synthetic-augmented) leveled sequence.
/// Synthetic filler headers are materialized and spliced into the tree as
/// soon as they're minted, so `id` always points at a real, reachable block.
struct LeveledHeader {
    id: BlockId,
    level: u8,
    title: String,
    page_id: usize,
}

/// Walks `headers`/`raw_levels` in order, maintaining a stack of open
/// ancestor levels, and applies `policy` whenever a header's raw level would
/// jump more than one past its nearest open ancestor.
fn enforce_monotonicity(
    doc: &mut Document,
    headers: &[Block],
    raw_levels: &[u8],
    policy: MonotonicityPolicy,
) -> Result<Vec<LeveledHeader>> {
    let mut stack: Vec<u8> = Vec::new();
    let mut out = Vec::with_capacity(headers.len());

    for (header, &raw_level) in headers.iter().zip(raw_levels) {
        while matches!(stack.last(), Some(&top) if top >= raw_level) {
            stack.pop();
        }
        let parent_level = stack.last().copied().unwrap_or(0);
        let mut level = raw_level;

        if level > parent_level + 1 {
            match policy {
                MonotonicityPolicy::Demote => {
                    level = parent_level + 1;
                }
                MonotonicityPolicy::InsertSynthetic => {
                    for filler_level in (parent_level + 1)..level {
                        let title = format!("(untitled level {filler_level})");
                        let new_id = doc.mint_id(header.page_id, Kind::SectionHeader);
                        let block = Block::new(
                            new_id.clone(),
                            Kind::SectionHeader,
                            Polygon::from_rect(0.0, 0.0, 0.0, 0.0),
                            header.page_id,
                        )
                        .with_text(title.clone())
                        .with_extraction_method(TextExtractionMethod::Inferred)
                        .with_payload(BlockPayload::SectionHeader {
                            level: filler_level,
                            breadcrumb: Vec::new(),
                        });
                        doc.register_block(block)?;
                        // Splice the synthetic header into the tree right
                        // before the real header that triggered the jump,
                        // so it's reachable from `top_level_blocks` like any
                        // other header (renderers and breadcrumb
                        // propagation both walk from there downward).
                        splice_before_in_page(doc, header.page_id, &header.id, new_id.clone())?;
                        out.push(LeveledHeader {
                            id: new_id,
                            level: filler_level,
                            title,
                            page_id: header.page_id,
                        });
                        stack.push(filler_level);
                    }
                }
            }
        }
        stack.push(level);
        out.push(LeveledHeader {
            id: header.id.clone(),
            level,
            title: header.text.clone(),
            page_id: header.page_id,
        });
    }

    Ok(out)
}

/// Inserts `new_id` into the page numbered `page_id`'s `top_level_blocks`
/// immediately before `anchor` (a real header already reachable from the
/// page). Section headers never gain a parent via `children` before this
/// processor runs, so the page's own top-level list is always where a
/// header lives.
fn splice_before_in_page(doc: &mut Document, page_id: usize, anchor: &BlockId, new_id: BlockId) -> Result<()> {
    let page = doc
        .pages
        .iter_mut()
        .find(|p| p.page_no == page_id)
        .ok_or_else(|| docling_core::DoclingError::UnknownBlockId(format!("no page {page_id} for synthetic section header")))?;
    let pos = page
        .top_level_blocks
        .iter()
        .position(|id| id == anchor)
        .ok_or_else(|| docling_core::DoclingError::UnknownBlockId(format!("anchor header {anchor} not found on page {page_id}")))?;
    page.top_level_blocks.insert(pos, new_id);
    Ok(())
}

/// Assigns each header's final `level`/`breadcrumb` payload by walking the
/// normalized sequence with a breadcrumb-entry stack mirroring the level
/// stack in [`enforce_monotonicity`].
fn assign_breadcrumbs(doc: &mut Document, normalized: &[LeveledHeader]) -> Result<()> {
    let mut stack: Vec<BreadcrumbEntry> = Vec::new();
    for entry in normalized {
        while matches!(stack.last(), Some(top) if top.level >= entry.level) {
            stack.pop();
        }
        let hash = stable_hash(&entry.title);
        let own_entry = BreadcrumbEntry {
            level: entry.level,
            title: entry.title.clone(),
            hash,
        };
        let mut breadcrumb: Vec<BreadcrumbEntry> = stack.clone();
        breadcrumb.push(own_entry.clone());

        let block = doc.get_mut(&entry.id)?;
        block.payload = BlockPayload::SectionHeader {
            level: entry.level,
            breadcrumb: breadcrumb.clone(),
        };
        stack.push(own_entry);
    }
    Ok(())
}

fn stable_hash(title: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    title.hash(&mut hasher);
    hasher.finish()
}

/// Attaches `metadata["breadcrumb"]` to every non-header content block,
/// pointing at the breadcrumb of the nearest preceding `SectionHeader` in
/// reading order on the same or an ancestor page.
fn propagate_breadcrumbs_to_content(doc: &mut Document) -> Result<()> {
    let mut current_breadcrumb: Option<Vec<BreadcrumbEntry>> = None;
    let header_ids: HashSet<BlockId> = doc
        .iter(Kind::SectionHeader, true)
        .into_iter()
        .map(|b| b.id.clone())
        .collect();

    for page_no in 0..doc.pages.len() {
        let top_level = doc.pages[page_no].top_level_blocks.clone();
        for id in top_level {
            apply_breadcrumb_recursive(doc, &id, &header_ids, &mut current_breadcrumb)?;
        }
    }
    Ok(())
}

fn apply_breadcrumb_recursive(
    doc: &mut Document,
    id: &BlockId,
    header_ids: &HashSet<BlockId>,
    current: &mut Option<Vec<BreadcrumbEntry>>,
) -> Result<()> {
    if header_ids.contains(id) {
        let block = doc.get(id)?;
        if let BlockPayload::SectionHeader { breadcrumb, .. } = &block.payload {
            *current = Some(breadcrumb.clone());
        }
        return Ok(());
    }

    let children = doc.get(id)?.children.clone();
    if let Some(breadcrumb) = current.as_ref() {
        let block = doc.get_mut(id)?;
        block.metadata.insert(
            "breadcrumb".to_string(),
            serde_json::to_value(breadcrumb).unwrap_or(serde_json::Value::Null),
        );
    }
    for child in children {
        apply_breadcrumb_recursive(doc, &child, header_ids, current)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::{DocumentMetadata, Page, Size};

    fn header(id: &str, page: usize, text: &str, level: u8) -> Block {
        Block::new(id.into(), Kind::SectionHeader, Polygon::from_rect(0.0, 0.0, 100.0, 20.0), page)
            .with_text(text)
            .with_extraction_method(TextExtractionMethod::Native)
            .with_payload(BlockPayload::SectionHeader {
                level,
                breadcrumb: Vec::new(),
            })
    }

    fn doc_with_headers(levels: &[(u8, &str)]) -> Document {
        let mut doc = Document::new(DocumentMetadata::default());
        let mut ids = Vec::new();
        for (i, (level, title)) in levels.iter().enumerate() {
            let id = format!("1_section_header_{i}");
            doc.register_block(header(&id, 1, title, *level)).unwrap();
            ids.push(id.into());
        }
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(600.0, 800.0),
            top_level_blocks: ids,
            raster_ref: None,
        });
        doc
    }

    #[test]
    fn numbering_depth_parses_dotted_numeric() {
        assert_eq!(numbering_depth("1. Introduction"), Some(1));
        assert_eq!(numbering_depth("1.2.3 Details"), Some(3));
        assert_eq!(numbering_depth("Appendix A: Data"), Some(1));
        assert_eq!(numbering_depth("A. Overview"), Some(1));
        assert_eq!(numbering_depth("Random text"), None);
    }

    #[test]
    fn s3_section_normalization_demotes_by_default() {
        // Spec S1 scenario: raw levels [1, 3, 3, 2] -> [1, 2, 2, 2].
        let mut doc = doc_with_headers(&[(1, "H1"), (3, "H2"), (3, "H3"), (2, "H4")]);
        build_section_hierarchy(&mut doc, MonotonicityPolicy::Demote).unwrap();
        let headers = doc.iter(Kind::SectionHeader, true);
        let levels: Vec<u8> = headers.iter().filter_map(|h| h.section_level()).collect();
        assert_eq!(levels, vec![1, 2, 2, 2]);

        let fourth = headers[3];
        let breadcrumb = fourth.breadcrumb().unwrap();
        let titles: Vec<&str> = breadcrumb.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["H1", "H4"]);
    }

    #[test]
    fn insert_synthetic_fills_missing_levels() {
        let mut doc = doc_with_headers(&[(1, "H1"), (3, "H2")]);
        build_section_hierarchy(&mut doc, MonotonicityPolicy::InsertSynthetic).unwrap();
        let headers = doc.iter(Kind::SectionHeader, true);
        // H1(1), synthetic(2), H2(3)
        assert_eq!(headers.len(), 3);
        let levels: Vec<u8> = headers.iter().filter_map(|h| h.section_level()).collect();
        assert_eq!(levels, vec![1, 2, 3]);
    }

    #[test]
    fn monotone_sequence_is_unchanged() {
        let mut doc = doc_with_headers(&[(1, "H1"), (2, "H2"), (3, "H3"), (2, "H4")]);
        build_section_hierarchy(&mut doc, MonotonicityPolicy::Demote).unwrap();
        let headers = doc.iter(Kind::SectionHeader, true);
        let levels: Vec<u8> = headers.iter().filter_map(|h| h.section_level()).collect();
        assert_eq!(levels, vec![1, 2, 3, 2]);
    }

    #[test]
    fn numbering_wins_over_absent_font_size() {
        let mut doc = doc_with_headers(&[(9, "1. Intro"), (9, "1.1 Background"), (9, "2. Method")]);
        build_section_hierarchy(&mut doc, MonotonicityPolicy::Demote).unwrap();
        let headers = doc.iter(Kind::SectionHeader, true);
        let levels: Vec<u8> = headers.iter().filter_map(|h| h.section_level()).collect();
        assert_eq!(levels, vec![1, 2, 1]);
    }
}
