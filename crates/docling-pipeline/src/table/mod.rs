//! Table subsystem orchestration (§4.7): per-table strategy A/B candidate
//! extraction, quality scoring, a conditional parameter search, strategy
//! arbitration, degraded-table fallback, and cross-boundary merging.
//!
//! The four stages run in order for every `Table` block, independently:
//! 1. **Candidate extraction** ([`heuristic`]) — strategy A (an injected
//!    [`heuristic::TableLayoutModel`]) and strategy B (the heuristic
//!    detector) each attempt a grid.
//! 2. **Quality scoring** ([`scoring`]) — every candidate is scored against
//!    the table region's source blocks.
//! 3. **Parameter search** — if neither first attempt reaches
//!    `table.accept_threshold`, a bounded sweep of strategy-B parameters
//!    (§4.7.3) runs, tracking the best candidate seen, exiting early once
//!    one clears `table.early_exit_threshold` or `table.max_candidates` is
//!    reached.
//! 4. **Arbitration** — the highest `combined()` score wins; ties break
//!    layout-model > heuristic > fewest cells (the simplest grid).
//!
//! A table whose best candidate still falls short of `table.min_viable_score`
//! is marked degraded (§4.7.6): it keeps its raw structure-ref text and a
//! recorded [`docling_core::DoclingError::TableExtractionFailed`], rather
//! than failing the whole run.
//!
//! [`merge::merge_adjacent_tables`] runs once after every table has been
//! resolved, gated on `table.enable_merging`.

pub mod heuristic;
pub mod merge;
pub mod scoring;

use std::sync::Arc;

use docling_core::{
    Block, BlockId, BlockPayload, Document, HeuristicParameters, Kind, KindFilter, PipelineConfig,
    QualityBreakdown, Result, TableExtractionMethod, TableMetadata,
};

use crate::cancellation::CancellationToken;
use crate::processor::Processor;
use heuristic::{default_parameters, heuristic_extract, resolve_source_blocks, sweep_lattice, NullLayoutModel, TableLayoutModel};
use scoring::{score_grid, CandidateGrid};

/// Extracts and scores a grid for every `Table` block, then merges
/// qualifying cross-boundary pairs.
///
/// The strategy-A collaborator defaults to [`NullLayoutModel`] (always
/// declines), so the processor runs end to end on strategy B alone without a
/// real ML layout model configured, per the external-collaborator seam
/// described in §4.7.1.
pub struct TableExtractionProcessor {
    layout_model: Arc<dyn TableLayoutModel>,
}

impl TableExtractionProcessor {
    /// Builds a processor with an explicit strategy-A collaborator.
    #[must_use = "creates a new processor"]
    pub fn new(layout_model: Arc<dyn TableLayoutModel>) -> Self {
        Self { layout_model }
    }
}

impl Default for TableExtractionProcessor {
    fn default() -> Self {
        Self::new(Arc::new(NullLayoutModel))
    }
}

/// A scored candidate tagged with the strategy/parameters that produced it.
struct Candidate {
    grid: CandidateGrid,
    breakdown: QualityBreakdown,
    method: TableExtractionMethod,
    parameters: Option<HeuristicParameters>,
}

impl Candidate {
    fn combined(&self) -> f64 {
        self.breakdown.combined()
    }
}

impl Processor for TableExtractionProcessor {
    fn name(&self) -> &'static str {
        "table_extraction"
    }

    fn kinds(&self) -> KindFilter {
        Kind::Table.into()
    }

    fn run(&self, doc: &mut Document, config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
        let table_ids: Vec<BlockId> = doc.iter(Kind::Table, true).iter().map(|b| b.id.clone()).collect();
        if token.is_cancelled() || table_ids.is_empty() {
            return Ok(());
        }

        // Per-table candidate extraction/scoring/sweep reads `doc` immutably
        // and is independent across tables: a bounded worker pool computes
        // every table's resolution concurrently (§5: "per-page table
        // extraction... uses a bounded worker pool with configurable
        // parallelism"), and the results are reassembled by table id before
        // the single sequential pass that actually mutates `doc`.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism.max(1))
            .build()
            .map_err(|e| docling_core::DoclingError::Other(e.into()))?;
        let resolutions: Vec<(BlockId, Resolution)> = pool.install(|| {
            use rayon::prelude::*;
            table_ids
                .par_iter()
                .map(|id| (id.clone(), self.compute_resolution(doc, id, config)))
                .collect()
        });

        for (table_id, resolution) in resolutions {
            if token.is_cancelled() {
                return Ok(());
            }
            self.apply_resolution(doc, &table_id, resolution)?;
        }

        if config.table.enable_merging {
            merge::merge_adjacent_tables(doc)?;
        }

        Ok(())
    }
}

/// Either a winning candidate to write, a degraded fallback with its reason,
/// or nothing to do (no resolvable source content).
enum Resolution {
    Skip,
    Winner(Candidate),
    Degraded(String),
}

impl TableExtractionProcessor {
    /// Runs candidate extraction, scoring, and the conditional parameter
    /// search for one table block against an immutable `doc` snapshot,
    /// deciding the winning candidate or degraded fallback without writing
    /// anything back. Pure aside from logging, so safe to run from any
    /// worker-pool thread.
    fn compute_resolution(&self, doc: &Document, table_id: &BlockId, config: &PipelineConfig) -> Resolution {
        let Ok(table_block) = doc.get(table_id).map(Block::clone) else {
            return Resolution::Skip;
        };
        let source_blocks = resolve_source_blocks(&table_block, doc);
        if source_blocks.is_empty() {
            return Resolution::Skip;
        }

        let mut candidates = Vec::new();
        if let Some(grid) = self.layout_model.infer(&table_block, doc) {
            let breakdown = score_grid(&grid, &source_blocks);
            candidates.push(Candidate {
                grid,
                breakdown,
                method: TableExtractionMethod::LayoutModel,
                parameters: None,
            });
        }
        if let Some(grid) = heuristic_extract(&table_block, doc, default_parameters()) {
            let breakdown = score_grid(&grid, &source_blocks);
            candidates.push(Candidate {
                grid,
                breakdown,
                method: TableExtractionMethod::HeuristicA,
                parameters: Some(default_parameters()),
            });
        }

        let best_so_far = candidates.iter().map(Candidate::combined).fold(0.0_f64, f64::max);

        if best_so_far < config.table.accept_threshold {
            candidates.extend(self.sweep(&table_block, doc, &source_blocks, config));
        }

        let winner = candidates
            .into_iter()
            .max_by(|a, b| a.combined().partial_cmp(&b.combined()).unwrap().then(tie_break(a, b)));

        let Some(winner) = winner else {
            return Resolution::Degraded("no candidate produced a grid".to_string());
        };

        if winner.combined() < config.table.min_viable_score {
            return Resolution::Degraded(format!(
                "best candidate scored {:.2}, below min_viable_score",
                winner.combined()
            ));
        }

        Resolution::Winner(winner)
    }

    /// Writes a [`Resolution`] computed by [`Self::compute_resolution`] into
    /// `table_id`'s payload. The only place this processor mutates `doc`.
    fn apply_resolution(&self, doc: &mut Document, table_id: &BlockId, resolution: Resolution) -> Result<()> {
        let winner = match resolution {
            Resolution::Skip => return Ok(()),
            Resolution::Degraded(reason) => {
                let table_block = doc.get(table_id)?.clone();
                return degrade(doc, table_id, &table_block, &reason);
            }
            Resolution::Winner(winner) => winner,
        };

        let block = doc.get_mut(table_id)?;
        block.payload = BlockPayload::Table {
            rows: winner.grid.rows,
            cols: winner.grid.cols,
            cells: winner.grid.cells,
            metadata: TableMetadata {
                extraction_method: winner.method,
                quality_score: winner.breakdown.combined(),
                quality_breakdown: winner.breakdown,
                merge_info: None,
                degraded: false,
                parameters: winner.parameters,
            },
        };
        Ok(())
    }

    /// Bounded parameter sweep (§4.7.3): tries [`sweep_lattice`]'s sixteen
    /// combinations in order, tracking the best candidate seen, stopping
    /// early once one clears `table.early_exit_threshold` or
    /// `table.max_candidates` candidates have been tried.
    fn sweep(&self, table_block: &Block, doc: &Document, source_blocks: &[&Block], config: &PipelineConfig) -> Vec<Candidate> {
        let mut tried = Vec::new();
        for params in sweep_lattice().into_iter().take(config.table.max_candidates) {
            let Some(grid) = heuristic_extract(table_block, doc, params) else {
                continue;
            };
            let breakdown = score_grid(&grid, source_blocks);
            let combined = breakdown.combined();
            tried.push(Candidate {
                grid,
                breakdown,
                method: TableExtractionMethod::HeuristicB,
                parameters: Some(params),
            });
            if combined >= config.table.early_exit_threshold {
                break;
            }
        }
        tried
    }
}

/// Orders candidates by `combined()` ascending, breaking exact ties by
/// strategy precedence (layout model > heuristic) then by simplicity
/// (fewer cells), so arbitration is deterministic across otherwise-equal
/// candidates.
fn tie_break(a: &Candidate, b: &Candidate) -> std::cmp::Ordering {
    rank(a.method).cmp(&rank(b.method)).then_with(|| b.grid.cells.len().cmp(&a.grid.cells.len()))
}

fn rank(method: TableExtractionMethod) -> u8 {
    match method {
        TableExtractionMethod::LayoutModel => 2,
        TableExtractionMethod::HeuristicA | TableExtractionMethod::HeuristicB => 1,
        TableExtractionMethod::Llm => 0,
    }
}

/// Marks `table_id` degraded (§4.7.6): keeps the raw structure-ref text
/// concatenated as the block's `text`, records a recoverable
/// `TableExtractionFailed`, and writes a minimal 1x1 payload carrying the
/// same text so renderers still have something to show.
fn degrade(doc: &mut Document, table_id: &BlockId, table_block: &Block, reason: &str) -> Result<()> {
    let source_blocks = resolve_source_blocks(table_block, doc);
    let raw_text = source_blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join(" ");
    let error = docling_core::DoclingError::TableExtractionFailed {
        table_id: table_id.to_string(),
        reason: reason.to_string(),
    };
    log::warn!("table {table_id} degraded: {reason}");
    let block = doc.get_mut(table_id)?;
    block.text = raw_text.clone();
    block.mark_recoverable_error(&error);
    block.payload = BlockPayload::Table {
        rows: 1,
        cols: 1,
        cells: vec![docling_core::TableCell::new(0, 0, raw_text)],
        metadata: TableMetadata {
            extraction_method: TableExtractionMethod::HeuristicA,
            quality_score: 0.0,
            quality_breakdown: QualityBreakdown {
                structure: 0.0,
                alignment: 0.0,
                content: 0.0,
                whitespace: 0.0,
            },
            merge_info: None,
            degraded: true,
            parameters: None,
        },
    };
    Ok(())
}
