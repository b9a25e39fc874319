//! Paragraph joining, hyphenation repair, header/footer stripping, and
//! multi-column reading order (§4.4).
//!
//! Implemented as one processor, `text_layout`, run in three passes over each
//! page in document order:
//!
//! 1. [`join_paragraphs`] — collapse runs of consecutive `Line` blocks into a
//!    single `Text` block, repairing end-of-line hyphenation and collapsing
//!    repeated whitespace. The original `Line` blocks are tombstoned
//!    (invariant 7: their ids stay reserved) rather than deleted outright.
//! 2. [`strip_running_headers_footers`] — a `Text` block that repeats at a
//!    stable y-band across a majority of pages is reclassified to
//!    `PageHeader`/`PageFooter` so later processors and renderers exclude it
//!    from the body flow.
//! 3. [`reorder_reading_order`] — re-sorts each page's top-level blocks into
//!    visual reading order via x-midpoint clustering, per the column
//!    detector described below.

use std::collections::HashMap;

use docling_core::{Block, BlockId, Document, Kind, KindFilter, PipelineConfig, Result, TextExtractionMethod};

use crate::cancellation::CancellationToken;
use crate::processor::Processor;

/// The combined text/reading-order processor (§4.4).
pub struct TextLayoutProcessor;

impl Processor for TextLayoutProcessor {
    fn name(&self) -> &'static str {
        "text_layout"
    }

    fn kinds(&self) -> KindFilter {
        vec![Kind::Line, Kind::Text, Kind::PageHeader, Kind::PageFooter].into()
    }

    fn run(&self, doc: &mut Document, _config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
        for page_no in 0..doc.pages.len() {
            if token.is_cancelled() {
                return Ok(());
            }
            join_paragraphs(doc, page_no)?;
        }
        strip_running_headers_footers(doc);
        for page_no in 0..doc.pages.len() {
            if token.is_cancelled() {
                return Ok(());
            }
            reorder_reading_order(doc, page_no);
        }
        Ok(())
    }
}

/// Collapses runs of consecutive top-level `Line` blocks on `page_no` into
/// joined `Text` blocks, repairing hyphenation and whitespace.
fn join_paragraphs(doc: &mut Document, page_no: usize) -> Result<()> {
    let top_level = doc.pages[page_no].top_level_blocks.clone();
    let mut new_top_level: Vec<BlockId> = Vec::with_capacity(top_level.len());
    let mut run: Vec<BlockId> = Vec::new();

    let flush = |doc: &mut Document, run: &mut Vec<BlockId>, out: &mut Vec<BlockId>| -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        if run.len() == 1 {
            // A single stray line is still promoted to Text, just without a join.
            let line = doc.get(&run[0])?.clone();
            let joined_text = collapse_whitespace(&line.text);
            let new_id = doc.mint_id(page_no, Kind::Text);
            let mut text_block = Block::new(new_id.clone(), Kind::Text, line.polygon, page_no)
                .with_text(joined_text)
                .with_extraction_method(line.text_extraction_method);
            text_block.structure_refs = run.clone();
            text_block.children = run.clone();
            doc.register_block(text_block)?;
            doc.get_mut(&run[0])?.removed = true;
            out.push(new_id);
        } else {
            let lines: Vec<Block> = run
                .iter()
                .map(|id| doc.get(id).cloned())
                .collect::<Result<_>>()?;
            let joined_text = join_hyphenated_lines(&lines);
            let polygon = union_polygon(lines.iter().map(|l| l.polygon));
            let method = lines[0].text_extraction_method;
            let new_id = doc.mint_id(page_no, Kind::Text);
            let mut text_block = Block::new(new_id.clone(), Kind::Text, polygon, page_no)
                .with_text(joined_text)
                .with_extraction_method(method);
            text_block.structure_refs = run.clone();
            text_block.children = run.clone();
            doc.register_block(text_block)?;
            for id in run.iter() {
                doc.get_mut(id)?.removed = true;
            }
            out.push(new_id);
        }
        run.clear();
        Ok(())
    };

    for id in top_level {
        let is_line = doc.get(&id)?.kind == Kind::Line;
        if is_line {
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

/// Joins `lines`' text, repairing a trailing hyphen followed by a lowercase
/// continuation (the common "hyphen-" + "ated" case) and collapsing
/// otherwise-repeated whitespace at the join point.
fn join_hyphenated_lines(lines: &[Block]) -> String {
    let mut joined = String::new();
    for (i, line) in lines.iter().enumerate() {
        let text = collapse_whitespace(&line.text);
        if i == 0 {
            joined.push_str(&text);
            continue;
        }
        if ends_with_soft_hyphen(&joined) && text.chars().next().is_some_and(|c| c.is_lowercase()) {
            joined.pop();
        } else if !joined.is_empty() && !joined.ends_with(char::is_whitespace) {
            joined.push(' ');
        }
        joined.push_str(&text);
    }
    joined
}

fn ends_with_soft_hyphen(s: &str) -> bool {
    s.ends_with('-') && !s.ends_with("--")
}

/// Collapses runs of ASCII/Unicode whitespace to a single space and trims
/// the ends, per §4.4's "collapse repeated whitespace".
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn union_polygon(mut polys: impl Iterator<Item = docling_core::Polygon>) -> docling_core::Polygon {
    let first = polys.next().unwrap_or(docling_core::Polygon::from_rect(0.0, 0.0, 0.0, 0.0));
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

/// Reclassifies `Text` blocks that repeat at a stable y-band on a majority
/// of pages as `PageHeader` (top 15% of page height) or `PageFooter` (bottom
/// 15%), so they are excluded from the body flow by later processors and
/// renderers. A block must match on normalized text *and* fall in the same
/// band on at least 3 pages, or on a majority of pages for short documents.
fn strip_running_headers_footers(doc: &mut Document) {
    let total_pages = doc.pages.len();
    if total_pages < 2 {
        return;
    }
    let min_repeats = (total_pages / 2).max(2).min(total_pages);

    // band -> normalized text -> (ids, pages seen)
    let mut header_candidates: HashMap<String, Vec<BlockId>> = HashMap::new();
    let mut footer_candidates: HashMap<String, Vec<BlockId>> = HashMap::new();

    for page in &doc.pages {
        let height = page.size.height.max(1.0);
        for id in &page.top_level_blocks {
            let Ok(block) = doc.get(id) else { continue };
            if block.kind != Kind::Text || block.removed {
                continue;
            }
            let (_, top, _, bottom) = block.polygon.bounding_rect();
            let key = normalize_for_repeat_match(&block.text);
            if key.is_empty() {
                continue;
            }
            if top <= 0.15 * height {
                header_candidates.entry(key).or_default().push(id.clone());
            } else if bottom >= 0.85 * height {
                footer_candidates.entry(key).or_default().push(id.clone());
            }
        }
    }

    for (kind, candidates) in [(Kind::PageHeader, header_candidates), (Kind::PageFooter, footer_candidates)] {
        for (_, ids) in candidates {
            // Count distinct pages, since a page could in principle repeat a
            // fragment twice (split across a nested block) without it being
            // a running header/footer.
            let distinct_pages: std::collections::HashSet<usize> =
                ids.iter().filter_map(|id| doc.get(id).ok()).map(|b| b.page_id).collect();
            if distinct_pages.len() >= min_repeats {
                for id in ids {
                    if let Ok(block) = doc.get_mut(&id) {
                        block.kind = kind;
                    }
                }
            }
        }
    }
}

fn normalize_for_repeat_match(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Re-sorts `page_no`'s top-level blocks into visual reading order by
/// clustering on x-midpoint (k-means, k chosen from `{1, 2, 3}` by
/// silhouette score) then sorting within each column by y-top and
/// concatenating columns left to right.
fn reorder_reading_order(doc: &mut Document, page_no: usize) {
    let ids = doc.pages[page_no].top_level_blocks.clone();
    if ids.len() < 3 {
        return; // Not enough points for meaningful clustering; keep provider order.
    }
    let points: Vec<(BlockId, f64, f64)> = ids
        .iter()
        .filter_map(|id| doc.get(id).ok().map(|b| (id.clone(), b.polygon.x_mid(), b.polygon.y_top())))
        .collect();
    if points.len() != ids.len() {
        return;
    }

    let xs: Vec<f64> = points.iter().map(|(_, x, _)| *x).collect();
    let k = best_k_by_silhouette(&xs);
    let labels = kmeans_1d(&xs, k);

    let mut columns: Vec<Vec<(BlockId, f64)>> = vec![Vec::new(); k];
    for ((id, _, y), label) in points.into_iter().zip(labels) {
        columns[label].push((id, y));
    }
    // Order columns left to right by mean x, not by arbitrary cluster index.
    let mut column_means: Vec<(usize, f64)> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let xs_in_col: Vec<f64> = col
                .iter()
                .filter_map(|(id, _)| doc.get(id).ok().map(|b| b.polygon.x_mid()))
                .collect();
            let mean = if xs_in_col.is_empty() {
                0.0
            } else {
                xs_in_col.iter().sum::<f64>() / xs_in_col.len() as f64
            };
            (i, mean)
        })
        .collect();
    column_means.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ordered = Vec::with_capacity(ids.len());
    for (i, _) in column_means {
        let mut col = columns[i].clone();
        col.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        ordered.extend(col.into_iter().map(|(id, _)| id));
    }
    doc.pages[page_no].top_level_blocks = ordered;
}

/// 1D k-means over `xs`, returning a cluster label per point. Deterministic:
/// seeded from evenly spaced quantiles rather than randomly, so repeated
/// runs over the same document are idempotent (testable property 7).
fn kmeans_1d(xs: &[f64], k: usize) -> Vec<usize> {
    if k <= 1 || xs.len() <= k {
        return vec![0; xs.len()];
    }
    let mut sorted: Vec<f64> = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut centroids: Vec<f64> = (0..k)
        .map(|i| sorted[i * (sorted.len() - 1) / (k - 1)])
        .collect();

    for _ in 0..20 {
        let labels: Vec<usize> = xs.iter().map(|&x| nearest_centroid(x, &centroids)).collect();
        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (&x, &label) in xs.iter().zip(&labels) {
            sums[label] += x;
            counts[label] += 1;
        }
        let mut moved = false;
        for i in 0..k {
            if counts[i] > 0 {
                let new_centroid = sums[i] / counts[i] as f64;
                if (new_centroid - centroids[i]).abs() > 1e-6 {
                    moved = true;
                }
                centroids[i] = new_centroid;
            }
        }
        if !moved {
            break;
        }
    }
    xs.iter().map(|&x| nearest_centroid(x, &centroids)).collect()
}

fn nearest_centroid(x: f64, centroids: &[f64]) -> usize {
    centroids
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - x).abs().partial_cmp(&(*b - x).abs()).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Picks `k in {1, 2, 3}` by mean silhouette score, the simplest criterion
/// that distinguishes "one column" from "genuinely side-by-side content"
/// without a fixed column-count assumption (§4.4).
fn best_k_by_silhouette(xs: &[f64]) -> usize {
    if xs.len() < 4 {
        return 1;
    }
    let mut best_k = 1;
    let mut best_score = f64::NEG_INFINITY;
    for k in 1..=3.min(xs.len()) {
        let score = if k == 1 {
            0.0 // Silhouette is undefined for a single cluster; treat as baseline.
        } else {
            let labels = kmeans_1d(xs, k);
            silhouette_score(xs, &labels, k)
        };
        if score > best_score + 1e-9 {
            best_score = score;
            best_k = k;
        }
    }
    best_k
}

fn silhouette_score(xs: &[f64], labels: &[usize], k: usize) -> f64 {
    if k < 2 {
        return 0.0;
    }
    let mut clusters: Vec<Vec<f64>> = vec![Vec::new(); k];
    for (&x, &label) in xs.iter().zip(labels) {
        clusters[label].push(x);
    }
    if clusters.iter().any(Vec::is_empty) {
        return f64::NEG_INFINITY; // Degenerate clustering: an empty column isn't a real split.
    }
    let mut total = 0.0;
    for (&x, &label) in xs.iter().zip(labels) {
        let own = &clusters[label];
        let a = if own.len() > 1 {
            own.iter().map(|&o| (o - x).abs()).sum::<f64>() / (own.len() - 1) as f64
        } else {
            0.0
        };
        let b = (0..k)
            .filter(|&c| c != label)
            .map(|c| clusters[c].iter().map(|&o| (o - x).abs()).sum::<f64>() / clusters[c].len() as f64)
            .fold(f64::INFINITY, f64::min);
        let s = if a.max(b) > 0.0 { (b - a) / a.max(b) } else { 0.0 };
        total += s;
    }
    total / xs.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::{DocumentMetadata, Page, Polygon, Size};

    fn line(id: &str, page: usize, text: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Block {
        Block::new(id.into(), Kind::Line, Polygon::from_rect(x0, y0, x1, y1), page)
            .with_text(text)
            .with_extraction_method(TextExtractionMethod::Native)
    }

    #[test]
    fn joins_hyphenated_lines_across_a_break() {
        let lines = vec![
            line("1_line_0", 1, "This is a hyphen-", 0.0, 0.0, 100.0, 10.0),
            line("1_line_1", 1, "ated word.", 0.0, 10.0, 100.0, 20.0),
        ];
        let joined = join_hyphenated_lines(&lines);
        assert_eq!(joined, "This is a hyphenated word.");
    }

    #[test]
    fn does_not_join_across_a_real_trailing_hyphen_before_uppercase() {
        let lines = vec![
            line("1_line_0", 1, "Pre-", 0.0, 0.0, 100.0, 10.0),
            line("1_line_1", 1, "Processing follows.", 0.0, 10.0, 100.0, 20.0),
        ];
        let joined = join_hyphenated_lines(&lines);
        assert_eq!(joined, "Pre- Processing follows.");
    }

    #[test]
    fn collapses_repeated_whitespace() {
        assert_eq!(collapse_whitespace("  a   b\t\tc  "), "a b c");
    }

    #[test]
    fn paragraph_join_promotes_lines_to_text_and_tombstones_originals() {
        let mut doc = Document::new(DocumentMetadata::default());
        let l0 = line("1_line_0", 1, "Hello", 0.0, 0.0, 50.0, 10.0);
        let l1 = line("1_line_1", 1, "world", 0.0, 10.0, 50.0, 20.0);
        doc.register_block(l0).unwrap();
        doc.register_block(l1).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(600.0, 800.0),
            top_level_blocks: vec!["1_line_0".into(), "1_line_1".into()],
            raster_ref: None,
        });
        join_paragraphs(&mut doc, 0).unwrap();
        assert_eq!(doc.pages[0].top_level_blocks.len(), 1);
        let text_id = doc.pages[0].top_level_blocks[0].clone();
        let text_block = doc.get(&text_id).unwrap();
        assert_eq!(text_block.kind, Kind::Text);
        assert_eq!(text_block.text, "Hello world");
        assert!(doc.get(&"1_line_0".into()).unwrap().removed);
        assert!(doc.get(&"1_line_1".into()).unwrap().removed);
    }

    #[test]
    fn running_footer_is_reclassified_across_pages() {
        let mut doc = Document::new(DocumentMetadata::default());
        for page_no in 1..=3 {
            let id = format!("{page_no}_text_0");
            let footer = Block::new(
                id.clone().into(),
                Kind::Text,
                Polygon::from_rect(0.0, 780.0, 100.0, 795.0),
                page_no,
            )
            .with_text(format!("Page {page_no} of 3"))
            .with_extraction_method(TextExtractionMethod::Native);
            doc.register_block(footer).unwrap();
            doc.add_page(Page {
                page_no,
                size: Size::new(600.0, 800.0),
                top_level_blocks: vec![id.into()],
                raster_ref: None,
            });
        }
        strip_running_headers_footers(&mut doc);
        for page_no in 1..=3 {
            let id: BlockId = format!("{page_no}_text_0").into();
            assert_eq!(doc.get(&id).unwrap().kind, Kind::PageFooter);
        }
    }

    #[test]
    fn best_k_picks_two_columns_for_clearly_bimodal_x() {
        let xs = vec![10.0, 12.0, 11.0, 300.0, 302.0, 301.0];
        assert_eq!(best_k_by_silhouette(&xs), 2);
    }

    #[test]
    fn best_k_picks_one_for_single_column() {
        let xs = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        assert_eq!(best_k_by_silhouette(&xs), 1);
    }
}
