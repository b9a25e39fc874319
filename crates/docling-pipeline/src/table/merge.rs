//! Cross-boundary table merging (§4.7.5): unions adjacent tables split by a
//! page break or a typographic accident.

use docling_core::{Block, BlockId, BlockPayload, Document, Kind, MergeInfo, Polygon, Result, TableCell};

const MAX_JACCARD_MISMATCH_ROWS: usize = 0; // Header row must match when present.

/// Scans adjacent `Table` blocks in reading order — within a page, and
/// across the boundary to the next page's first table — merging pairs that
/// satisfy every criterion in §4.7.5. Runs until no more adjacent pair
/// qualifies (a merge can make a newly unioned table eligible to merge with
/// a further successor).
pub fn merge_adjacent_tables(doc: &mut Document) -> Result<()> {
    loop {
        let candidates = adjacent_table_pairs(doc);
        let mut merged_any = false;
        for (first, second) in candidates {
            if doc.get(&first)?.removed || doc.get(&second)?.removed {
                continue;
            }
            if should_merge(doc, &first, &second)? {
                merge_pair(doc, &first, &second)?;
                merged_any = true;
                break; // Restart: ids/adjacency shifted after a merge.
            }
        }
        if !merged_any {
            break;
        }
    }
    Ok(())
}

/// All consecutive `(first, second)` table pairs in document reading order,
/// including the pair formed by a page's last table and the next page's
/// first table.
fn adjacent_table_pairs(doc: &Document) -> Vec<(BlockId, BlockId)> {
    let tables: Vec<&Block> = doc.iter(Kind::Table, true);
    tables.windows(2).map(|w| (w[0].id.clone(), w[1].id.clone())).collect()
}

fn should_merge(doc: &Document, first_id: &BlockId, second_id: &BlockId) -> Result<bool> {
    let first = doc.get(first_id)?;
    let second = doc.get(second_id)?;
    let (Some((_, first_cols, _, _)), Some((_, second_cols, second_cells, _))) =
        (table_dims(first), table_dims(second))
    else {
        return Ok(false);
    };
    if first_cols != second_cols {
        return Ok(false);
    }

    if !header_compatible(first, second_cells)? {
        return Ok(false);
    }

    if !geometrically_adjacent(doc, first, second) {
        return Ok(false);
    }

    if intervening_blocks_exist(doc, first_id, second_id)? {
        return Ok(false);
    }

    Ok(true)
}

fn table_dims(block: &Block) -> Option<(usize, usize, &[TableCell], &docling_core::TableMetadata)> {
    match &block.payload {
        BlockPayload::Table { rows, cols, cells, metadata } => Some((*rows, *cols, cells, metadata)),
        _ => None,
    }
}

/// Either the second table has no header row (a lattice extension — its
/// first row is data, not a repeated header), or its header row's
/// normalized-text Jaccard similarity against the first table's header row
/// is `>= 0.8`.
fn header_compatible(first: &Block, second_cells: &[TableCell]) -> Result<bool> {
    let second_header_present = second_cells.iter().any(|c| c.is_header);
    if !second_header_present {
        return Ok(true);
    }
    let BlockPayload::Table { cells: first_cells, .. } = &first.payload else {
        return Ok(false);
    };
    let first_header_tokens = header_tokens(first_cells);
    let second_header_tokens = header_tokens(second_cells);
    if first_header_tokens.is_empty() || second_header_tokens.is_empty() {
        return Ok(MAX_JACCARD_MISMATCH_ROWS == 0);
    }
    Ok(jaccard(&first_header_tokens, &second_header_tokens) >= 0.8)
}

fn header_tokens(cells: &[TableCell]) -> std::collections::HashSet<String> {
    cells
        .iter()
        .filter(|c| c.is_header)
        .flat_map(|c| c.text.split_whitespace().map(|w| w.to_lowercase()))
        .collect()
}

fn jaccard(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Vertical gap `< 1.5x` the median row height (same page), or the second
/// table starts within the top 15% of the next page.
fn geometrically_adjacent(doc: &Document, first: &Block, second: &Block) -> bool {
    if first.page_id == second.page_id {
        let (_, _, _, first_bottom) = first.polygon.bounding_rect();
        let (_, second_top, _, _) = second.polygon.bounding_rect();
        let gap = second_top - first_bottom;
        let median_row_height = median_row_height(first).max(1.0);
        gap >= 0.0 && gap < 1.5 * median_row_height
    } else {
        let Some(page) = doc.pages.iter().find(|p| p.page_no == second.page_id) else {
            return false;
        };
        let (_, second_top, _, _) = second.polygon.bounding_rect();
        second_top <= 0.15 * page.size.height.max(1.0)
    }
}

fn median_row_height(table: &Block) -> f64 {
    let BlockPayload::Table { rows, .. } = &table.payload else { return 20.0 };
    if *rows == 0 {
        return 20.0;
    }
    table.polygon.height() / *rows as f64
}

/// No block other than `PageHeader`/`PageFooter` sits between the two
/// tables in reading order.
fn intervening_blocks_exist(doc: &Document, first_id: &BlockId, second_id: &BlockId) -> Result<bool> {
    let all: Vec<&Block> = doc.iter(docling_core::KindFilter::Any, true);
    let first_pos = all.iter().position(|b| &b.id == first_id);
    let second_pos = all.iter().position(|b| &b.id == second_id);
    let (Some(fp), Some(sp)) = (first_pos, second_pos) else {
        return Ok(true);
    };
    if sp <= fp {
        return Ok(true);
    }
    for block in &all[fp + 1..sp] {
        if !matches!(block.kind, Kind::PageHeader | Kind::PageFooter) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Unions `first` and `second` into a freshly minted `Table` block
/// preserving all rows, recording `merge_info`, and tombstoning the
/// originals (invariant 7).
fn merge_pair(doc: &mut Document, first_id: &BlockId, second_id: &BlockId) -> Result<()> {
    let first = doc.get(first_id)?.clone();
    let second = doc.get(second_id)?.clone();
    let (BlockPayload::Table { rows: first_rows, cols, cells: first_cells, metadata: first_meta }, BlockPayload::Table { rows: second_rows, cells: second_cells, metadata: second_meta, .. }) =
        (first.payload.clone(), second.payload.clone())
    else {
        return Ok(());
    };

    let mut merged_cells = first_cells.clone();
    for cell in &second_cells {
        if cell.is_header && header_tokens(&first_cells).len() > 0 {
            continue; // Drop the second table's header row: it's a repeat.
        }
        let mut shifted = cell.clone();
        shifted.row_index += first_rows;
        merged_cells.push(shifted);
    }
    let dropped_second_header = second_cells.iter().any(|c| c.is_header) && !header_tokens(&first_cells).is_empty();
    let total_rows = first_rows + second_rows - usize::from(dropped_second_header);

    let best_metadata = if second_meta.quality_score > first_meta.quality_score {
        second_meta.clone()
    } else {
        first_meta.clone()
    };

    let page_id = first.page_id;
    let new_id = doc.mint_id(page_id, Kind::Table);
    let polygon = union_rect(first.polygon, second.polygon);
    let mut new_block = Block::new(new_id.clone(), Kind::Table, polygon, page_id)
        .with_text(format!("{} {}", first.text, second.text).trim().to_string())
        .with_extraction_method(first.text_extraction_method);
    new_block.structure_refs = {
        let mut refs = first.structure_refs.clone();
        refs.extend(second.structure_refs.clone());
        refs
    };
    new_block.payload = BlockPayload::Table {
        rows: total_rows,
        cols,
        cells: merged_cells,
        metadata: docling_core::TableMetadata {
            extraction_method: best_metadata.extraction_method,
            quality_score: best_metadata.quality_score,
            quality_breakdown: best_metadata.quality_breakdown,
            merge_info: Some(MergeInfo {
                was_merged: true,
                reason: "page-boundary continuation".to_string(),
                original_table_ids: vec![first_id.clone(), second_id.clone()],
            }),
            degraded: first_meta.degraded || second_meta.degraded,
            parameters: best_metadata.parameters,
        },
    };
    doc.register_block(new_block)?;

    replace_in_page(doc, first_id, second_id, &new_id);
    doc.get_mut(first_id)?.removed = true;
    doc.get_mut(second_id)?.removed = true;
    Ok(())
}

fn union_rect(a: Polygon, b: Polygon) -> Polygon {
    let (al, at, ar, ab) = a.bounding_rect();
    let (bl, bt, br, bb) = b.bounding_rect();
    Polygon::from_rect(al.min(bl), at.min(bt), ar.max(br), ab.max(bb))
}

/// Replaces `first`'s slot in its page's (or parent's) block list with
/// `merged`, and removes `second`'s slot outright.
fn replace_in_page(doc: &mut Document, first: &BlockId, second: &BlockId, merged: &BlockId) {
    for page in &mut doc.pages {
        if let Some(pos) = page.top_level_blocks.iter().position(|id| id == first) {
            page.top_level_blocks[pos] = merged.clone();
        }
        page.top_level_blocks.retain(|id| id != second);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::{DocumentMetadata, Page, Size, TableExtractionMethod, TextExtractionMethod, QualityBreakdown, TableMetadata};

    fn table_block(id: &str, page: usize, rows: usize, cols: usize, cells: Vec<TableCell>, rect: (f64, f64, f64, f64)) -> Block {
        let mut block = Block::new(id.into(), Kind::Table, Polygon::from_rect(rect.0, rect.1, rect.2, rect.3), page)
            .with_extraction_method(TextExtractionMethod::Native);
        block.payload = BlockPayload::Table {
            rows,
            cols,
            cells,
            metadata: TableMetadata {
                extraction_method: TableExtractionMethod::HeuristicA,
                quality_score: 0.8,
                quality_breakdown: QualityBreakdown {
                    structure: 0.8,
                    content: 0.8,
                    alignment: 0.8,
                    whitespace: 0.8,
                },
                merge_info: None,
                degraded: false,
                parameters: None,
            },
        };
        block
    }

    #[test]
    fn s4_merges_table_split_across_a_page_boundary() {
        let mut doc = Document::new(DocumentMetadata::default());
        let header_cells = vec![
            TableCell { is_header: true, ..TableCell::new(0, 0, "Model") },
            TableCell { is_header: true, ..TableCell::new(0, 1, "Acc") },
            TableCell { is_header: true, ..TableCell::new(0, 2, "F1") },
            TableCell::new(1, 0, "a"),
            TableCell::new(1, 1, "b"),
            TableCell::new(1, 2, "c"),
            TableCell::new(2, 0, "d"),
            TableCell::new(2, 1, "e"),
            TableCell::new(2, 2, "f"),
        ];
        let table_a = table_block("1_table_0", 1, 3, 3, header_cells, (0.0, 700.0, 400.0, 780.0));
        doc.register_block(table_a).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(600.0, 800.0),
            top_level_blocks: vec!["1_table_0".into()],
            raster_ref: None,
        });

        let data_cells = vec![
            TableCell::new(0, 0, "g"),
            TableCell::new(0, 1, "h"),
            TableCell::new(0, 2, "i"),
            TableCell::new(1, 0, "j"),
            TableCell::new(1, 1, "k"),
            TableCell::new(1, 2, "l"),
        ];
        let table_b = table_block("2_table_0", 2, 2, 3, data_cells, (0.0, 20.0, 400.0, 100.0));
        doc.register_block(table_b).unwrap();
        doc.add_page(Page {
            page_no: 2,
            size: Size::new(600.0, 800.0),
            top_level_blocks: vec!["2_table_0".into()],
            raster_ref: None,
        });

        merge_adjacent_tables(&mut doc).unwrap();

        let remaining: Vec<&Block> = doc.iter(Kind::Table, true);
        assert_eq!(remaining.len(), 1);
        let merged = remaining[0];
        let BlockPayload::Table { rows, .. } = &merged.payload else { panic!() };
        assert_eq!(*rows, 5); // 3 + 2, no header dropped (second had none).
        let BlockPayload::Table { metadata, .. } = &merged.payload else { panic!() };
        assert!(metadata.merge_info.as_ref().unwrap().was_merged);
        assert_eq!(
            metadata.merge_info.as_ref().unwrap().original_table_ids,
            vec![BlockId::from("1_table_0"), BlockId::from("2_table_0")]
        );
    }

    #[test]
    fn does_not_merge_tables_with_different_column_counts() {
        let mut doc = Document::new(DocumentMetadata::default());
        let table_a = table_block("1_table_0", 1, 1, 3, vec![TableCell::new(0, 0, "x")], (0.0, 700.0, 400.0, 780.0));
        let table_b = table_block("1_table_1", 1, 1, 2, vec![TableCell::new(0, 0, "y")], (0.0, 782.0, 400.0, 790.0));
        doc.register_block(table_a).unwrap();
        doc.register_block(table_b).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(600.0, 800.0),
            top_level_blocks: vec!["1_table_0".into(), "1_table_1".into()],
            raster_ref: None,
        });
        merge_adjacent_tables(&mut doc).unwrap();
        assert_eq!(doc.iter(Kind::Table, true).len(), 2);
    }
}
