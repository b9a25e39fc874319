//! Strategy A (external ML layout model) and Strategy B (heuristic ruling /
//! whitespace-column detector) candidate extraction (§4.7.1).

use docling_core::{Block, Document, HeuristicParameters, TableCell, TableFlavor};

use crate::table::scoring::CandidateGrid;

/// External collaborator contract for strategy A: an ML layout/table-
/// structure model that consumes a rasterized crop plus word/line geometry
/// and returns a candidate grid. Model invocation is out of scope for the
/// core (§1); this crate only defines the seam. Callers without a real
/// model wire in [`NullLayoutModel`], which always declines.
pub trait TableLayoutModel: Send + Sync {
    /// Attempts to infer a grid for `table_block`. Returns `None` when the
    /// model has no opinion (e.g. unreachable, or declines this region).
    fn infer(&self, table_block: &Block, doc: &Document) -> Option<CandidateGrid>;
}

/// The default strategy-A collaborator: never produces a candidate. Used
/// when no real layout model is configured, so the table subsystem still
/// runs end to end on strategy B alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLayoutModel;

impl TableLayoutModel for NullLayoutModel {
    fn infer(&self, _table_block: &Block, _doc: &Document) -> Option<CandidateGrid> {
        None
    }
}

/// Resolves a table block's `structure_refs` into the blocks composing it
/// (its constituent text spans/lines), in document order.
pub fn resolve_source_blocks<'a>(table_block: &Block, doc: &'a Document) -> Vec<&'a Block> {
    table_block
        .structure_refs
        .iter()
        .filter_map(|id| doc.get(id).ok())
        .collect()
}

/// Strategy B: detects rows by clustering source blocks' y-top, and columns
/// either from explicit ruling positions recorded by the provider
/// (`metadata["column_rulings"]`, a lattice flavor) or by whitespace-gap
/// inference when absent (stream flavor).
///
/// `params.line_scale` acts as the row/column clustering tolerance in
/// points: larger values merge blocks that are further apart into the same
/// row/column, modeling a coarser ruling-detection pass.
pub fn heuristic_extract(table_block: &Block, doc: &Document, params: HeuristicParameters) -> Option<CandidateGrid> {
    let sources = resolve_source_blocks(table_block, doc);
    if sources.is_empty() {
        return None;
    }

    let row_tolerance = f64::from(params.line_scale) * 0.4;
    let rows = cluster_1d(&sources.iter().map(|b| b.polygon.y_top()).collect::<Vec<_>>(), row_tolerance);

    let explicit_columns: Option<Vec<f64>> = table_block
        .metadata
        .get("column_rulings")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(serde_json::Value::as_f64).collect());

    let cols = match (params.flavor, explicit_columns) {
        (TableFlavor::Lattice, Some(rulings)) if rulings.len() >= 2 => rulings.len() - 1,
        _ => {
            let col_tolerance = f64::from(params.line_scale) * 0.6;
            cluster_1d(&sources.iter().map(|b| b.polygon.x_mid()).collect::<Vec<_>>(), col_tolerance).len()
        }
    };
    let cols = cols.max(1);
    let row_count = rows.len().max(1);

    let mut cells: Vec<TableCell> = Vec::with_capacity(row_count * cols);
    let mut grid_text: Vec<Vec<String>> = vec![vec![String::new(); cols]; row_count];

    for block in &sources {
        let row_idx = nearest_cluster(block.polygon.y_top(), &rows);
        let col_idx = if cols == 1 {
            0
        } else {
            let col_centers = cluster_1d(&sources.iter().map(|b| b.polygon.x_mid()).collect::<Vec<_>>(), f64::from(params.line_scale) * 0.6);
            nearest_cluster(block.polygon.x_mid(), &col_centers).min(cols - 1)
        };
        if row_idx >= row_count {
            continue;
        }
        if params.split_text || grid_text[row_idx][col_idx].is_empty() {
            if !grid_text[row_idx][col_idx].is_empty() {
                grid_text[row_idx][col_idx].push(' ');
            }
            grid_text[row_idx][col_idx].push_str(block.text.trim());
        }
    }

    for (r, row) in grid_text.into_iter().enumerate() {
        for (c, text) in row.into_iter().enumerate() {
            let mut cell = TableCell::new(r, c, text);
            cell.is_header = r == 0;
            cells.push(cell);
        }
    }

    Some(CandidateGrid {
        rows: row_count,
        cols,
        cells,
    })
}

/// Clusters `values` into groups no further than `tolerance` apart,
/// returning each cluster's mean, sorted ascending. A simple single-pass
/// agglomeration — adequate for the small, already-sorted-ish geometry
/// clusters a table region produces, and cheap enough to re-run across the
/// parameter sweep's candidate grid.
fn cluster_1d(values: &[f64], tolerance: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut clusters: Vec<Vec<f64>> = vec![vec![sorted[0]]];
    for &v in &sorted[1..] {
        let last = clusters.last_mut().unwrap();
        if v - last.last().unwrap() <= tolerance {
            last.push(v);
        } else {
            clusters.push(vec![v]);
        }
    }
    clusters
        .into_iter()
        .map(|c| c.iter().sum::<f64>() / c.len() as f64)
        .collect()
}

fn nearest_cluster(value: f64, clusters: &[f64]) -> usize {
    clusters
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - value).abs().partial_cmp(&(*b - value).abs()).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// The fixed parameter sweep lattice for §4.7.3: `line_scale in {15, 25, 40,
/// 60}` crossed with `flavor` and `shift_text`, `line_width`/`split_text`
/// held at sensible defaults. Capped by the caller at `max_candidates`.
pub fn sweep_lattice() -> Vec<HeuristicParameters> {
    let mut out = Vec::new();
    for &line_scale in &[15u32, 25, 40, 60] {
        for &flavor in &[TableFlavor::Lattice, TableFlavor::Stream] {
            for &shift_text in &[false, true] {
                out.push(HeuristicParameters {
                    line_scale,
                    line_width: 1.0,
                    flavor,
                    shift_text,
                    split_text: false,
                });
            }
        }
    }
    out
}

/// Default parameters for strategy B's first, unswept attempt.
pub fn default_parameters() -> HeuristicParameters {
    HeuristicParameters {
        line_scale: 25,
        line_width: 1.0,
        flavor: TableFlavor::Stream,
        shift_text: false,
        split_text: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_1d_groups_close_values() {
        let clusters = cluster_1d(&[10.0, 12.0, 50.0, 52.0, 53.0], 5.0);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn sweep_lattice_has_sixteen_combinations() {
        assert_eq!(sweep_lattice().len(), 16);
    }
}
