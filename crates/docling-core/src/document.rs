//! The `Document` root and its block index.
//!
//! The `Document` exclusively owns all blocks through its global index;
//! `children`/`structure_refs` are non-owning [`BlockId`] references. All
//! navigation goes through the index — there are no owned parent/child
//! pointers, which is what keeps the containment graph trivially acyclic to
//! check and the breadcrumb/section-of-block relationships representable
//! without back-references.

use crate::block::{Block, BlockId, BreadcrumbEntry, Kind};
use crate::error::{DoclingError, Result};
use crate::format::InputFormat;
use crate::geometry::Size;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Document-level metadata, populated by the provider and enriched by
/// processors (e.g. detected `language`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document title, if detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// ISO 639-1 language code, if detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// The format the document was converted from.
    pub source_format: Option<InputFormat>,
    /// Wall-clock time spent in the processor pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    /// Recoverable issues accumulated during processing (§7's
    /// `validation.issues[]`), surfaced to renderers and callers.
    #[serde(default)]
    pub validation_issues: Vec<ValidationIssue>,
    /// Document creation timestamp, when the source format carries one
    /// (DOCX/PPTX `docProps/core.xml`, a PDF `/Info` dictionary).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<chrono::DateTime<chrono::Utc>>,
    /// Document last-modified timestamp, when the source format carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// One recoverable issue recorded during processing, per §7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// The stable error code (e.g. `"TableExtractionFailed"`).
    pub error_code: String,
    /// Id of the block the issue is attached to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    /// Human-readable detail.
    pub message: String,
}

/// A page: an ordered sequence of top-level block ids plus page-level
/// geometry. Iteration over `top_level_blocks` is the intended visual
/// reading order (invariant 3); processors that reorder must preserve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub page_no: usize,
    /// Pixel/point dimensions of the page.
    pub size: Size,
    /// Ordered ids of this page's top-level blocks.
    pub top_level_blocks: Vec<BlockId>,
    /// Reference to a rasterized page image, if the provider produced one
    /// (opaque to the core; interpreted by renderers/providers only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raster_ref: Option<String>,
}

impl Page {
    /// Creates an empty page with the given number and size.
    #[must_use = "creates a new page"]
    pub const fn new(page_no: usize, size: Size) -> Self {
        Self {
            page_no,
            size,
            top_level_blocks: Vec::new(),
            raster_ref: None,
        }
    }
}

/// A filter for [`Document::iter`].
#[derive(Debug, Clone)]
pub enum KindFilter {
    /// Visit every non-removed block.
    Any,
    /// Visit only blocks of the given kind.
    One(Kind),
    /// Visit only blocks whose kind is in the given set.
    Set(Vec<Kind>),
}

impl KindFilter {
    fn matches(&self, kind: Kind) -> bool {
        match self {
            Self::Any => true,
            Self::One(k) => *k == kind,
            Self::Set(ks) => ks.contains(&kind),
        }
    }
}

impl From<Kind> for KindFilter {
    fn from(k: Kind) -> Self {
        Self::One(k)
    }
}

impl From<Vec<Kind>> for KindFilter {
    fn from(ks: Vec<Kind>) -> Self {
        Self::Set(ks)
    }
}

/// One header in the derived section tree (see [`Document::assemble_sections`]).
#[derive(Debug, Clone, PartialEq)]
pub struct SectionNode {
    /// The `SectionHeader` block id.
    pub header_id: BlockId,
    /// Normalized level, 1..6.
    pub level: u8,
    /// Heading text at build time.
    pub title: String,
    /// Child sections, in document order.
    pub children: Vec<SectionNode>,
}

/// The derived section hierarchy, rooted above all level-1 headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionTree {
    /// Top-level (level-1) sections, in document order.
    pub roots: Vec<SectionNode>,
}

/// Root of the document model: an ordered sequence of pages, a global block
/// index, and document-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata.
    pub metadata: DocumentMetadata,
    /// Ordered pages.
    pub pages: Vec<Page>,
    /// Global block index: id -> block. The single source of truth; all
    /// navigation (children, structure_refs, breadcrumbs) resolves through
    /// this map rather than owned pointers.
    blocks: HashMap<BlockId, Block>,
    /// Monotonic counter per `(page, kind)`, used to mint fresh ids for
    /// blocks synthesized by processors (e.g. a merged table).
    #[serde(skip)]
    id_counters: HashMap<(usize, &'static str), usize>,
    /// Set while a `Document.iter()` traversal is live; mutation during
    /// iteration raises `ConcurrentMutation` (invariant: no mutation while
    /// iterating).
    #[serde(skip)]
    iterating: bool,
}

impl Document {
    /// Creates an empty document with the given metadata.
    #[must_use = "creates a new document"]
    pub fn new(metadata: DocumentMetadata) -> Self {
        Self {
            metadata,
            pages: Vec::new(),
            blocks: HashMap::new(),
            id_counters: HashMap::new(),
            iterating: false,
        }
    }

    /// Appends a page. The page's blocks must already be registered via
    /// [`Document::register_block`].
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Registers a block in the global index, returning its id.
    ///
    /// # Errors
    /// Returns [`DoclingError::ConcurrentMutation`] if called while an
    /// iteration guard is active.
    pub fn register_block(&mut self, block: Block) -> Result<BlockId> {
        if self.iterating {
            return Err(DoclingError::ConcurrentMutation(
                "register_block called during Document::iter traversal".to_string(),
            ));
        }
        let id = block.id.clone();
        self.blocks.insert(id.clone(), block);
        Ok(id)
    }

    /// Mints a fresh, unused id for a block synthesized on the given page
    /// and kind (e.g. a cross-page table merge).
    #[must_use = "returns a freshly minted block id"]
    pub fn mint_id(&mut self, page: usize, kind: Kind) -> BlockId {
        loop {
            let counter = self
                .id_counters
                .entry((page, kind.slug()))
                .and_modify(|c| *c += 1)
                .or_insert(0);
            let candidate = BlockId::new(page, kind, *counter);
            if !self.blocks.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Looks up a block by id.
    ///
    /// # Errors
    /// Returns [`DoclingError::UnknownBlockId`] if `id` does not resolve.
    pub fn get(&self, id: &BlockId) -> Result<&Block> {
        self.blocks
            .get(id)
            .ok_or_else(|| DoclingError::UnknownBlockId(id.to_string()))
    }

    /// Mutable lookup by id. See [`Document::get`] for the error contract.
    pub fn get_mut(&mut self, id: &BlockId) -> Result<&mut Block> {
        self.blocks
            .get_mut(id)
            .ok_or_else(|| DoclingError::UnknownBlockId(id.to_string()))
    }

    /// Total number of blocks in the index, including removed tombstones.
    #[must_use = "returns the number of blocks"]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Scans every block for an `error_code` left by
    /// [`Block::mark_recoverable_error`] and records one [`ValidationIssue`]
    /// per hit in `self.metadata.validation_issues` (§7: "the emitted
    /// document carries `validation.issues[]`").
    ///
    /// Idempotent: clears and rebuilds the list each call, so re-running a
    /// pipeline pass doesn't accumulate duplicate issues from the same block.
    pub fn collect_validation_issues(&mut self) {
        let mut issues: Vec<ValidationIssue> = self
            .blocks
            .values()
            .filter_map(|b| {
                let code = b.metadata.get("error_code")?.as_str()?.to_string();
                Some(ValidationIssue {
                    error_code: code,
                    block_id: Some(b.id.to_string()),
                    message: b.text.clone(),
                })
            })
            .collect();
        issues.sort_by(|a, b| a.block_id.cmp(&b.block_id));
        self.metadata.validation_issues = issues;
    }

    /// Lazily traverses blocks matching `filter`.
    ///
    /// When `in_page_order` is `true`, blocks are yielded page-by-page,
    /// each page's top-level blocks in reading order, descending into
    /// `children` depth-first; otherwise the global index order is used
    /// (unspecified across mutations, but stable within one call).
    ///
    /// Removed (tombstoned) blocks are skipped. Each matching, non-removed
    /// block is visited exactly once.
    #[must_use = "returns the matching blocks; does nothing on its own"]
    pub fn iter(&self, filter: impl Into<KindFilter>, in_page_order: bool) -> Vec<&Block> {
        let filter = filter.into();
        if !in_page_order {
            let mut out: Vec<&Block> = self
                .blocks
                .values()
                .filter(|b| !b.removed && filter.matches(b.kind))
                .collect();
            out.sort_by(|a, b| a.id.0.cmp(&b.id.0));
            return out;
        }
        let mut out = Vec::new();
        for page in &self.pages {
            for top_id in &page.top_level_blocks {
                self.collect_depth_first(top_id, &filter, &mut out);
            }
        }
        out
    }

    fn collect_depth_first<'a>(&'a self, id: &BlockId, filter: &KindFilter, out: &mut Vec<&'a Block>) {
        let Ok(block) = self.get(id) else { return };
        if block.removed {
            return;
        }
        if filter.matches(block.kind) {
            out.push(block);
        }
        for child in &block.children {
            self.collect_depth_first(child, filter, out);
        }
    }

    /// Runs `f` with an iteration guard held, rejecting any `register_block`
    /// call made from within `f` with `ConcurrentMutation`. Processors that
    /// need to mutate based on a traversal should first snapshot the ids
    /// they need (e.g. via [`Document::iter`]) and mutate afterward.
    pub fn with_iteration_guard<T>(&mut self, f: impl FnOnce(&Self) -> T) -> T {
        self.iterating = true;
        let result = f(self);
        self.iterating = false;
        result
    }

    /// The next top-level sibling of `id` on the same page, if any.
    #[must_use = "returns the next sibling, if any"]
    pub fn next_sibling(&self, id: &BlockId) -> Option<&Block> {
        let siblings = self.sibling_list(id)?;
        let pos = siblings.iter().position(|s| *s == id)?;
        siblings.get(pos + 1).and_then(|sid| self.blocks.get(sid))
    }

    /// The previous top-level sibling of `id` on the same page, if any.
    #[must_use = "returns the previous sibling, if any"]
    pub fn prev_sibling(&self, id: &BlockId) -> Option<&Block> {
        let siblings = self.sibling_list(id)?;
        let pos = siblings.iter().position(|s| *s == id)?;
        pos.checked_sub(1)
            .and_then(|p| siblings.get(p))
            .and_then(|sid| self.blocks.get(sid))
    }

    fn sibling_list(&self, id: &BlockId) -> Option<Vec<&BlockId>> {
        for page in &self.pages {
            if page.top_level_blocks.iter().any(|b| b == id) {
                return Some(page.top_level_blocks.iter().collect());
            }
            if let Some(parent) = page
                .top_level_blocks
                .iter()
                .find_map(|top| self.find_parent_of(top, id))
            {
                return self.blocks.get(parent).map(|p| p.children.iter().collect());
            }
        }
        None
    }

    fn find_parent_of<'a>(&'a self, root: &'a BlockId, target: &BlockId) -> Option<&'a BlockId> {
        let block = self.blocks.get(root)?;
        if block.children.iter().any(|c| c == target) {
            return Some(root);
        }
        block.children.iter().find_map(|c| self.find_parent_of(c, target))
    }

    /// Ancestor chain of `id`, nearest first, up to (not including) the page root.
    #[must_use = "returns the ancestor chain"]
    pub fn ancestors(&self, id: &BlockId) -> Vec<&Block> {
        let mut chain = Vec::new();
        let mut current = id.clone();
        'outer: loop {
            for page in &self.pages {
                for top in &page.top_level_blocks {
                    if let Some(parent_id) = self.find_parent_of(top, &current) {
                        if let Some(parent) = self.blocks.get(parent_id) {
                            chain.push(parent);
                            current = parent_id.clone();
                            continue 'outer;
                        }
                    }
                }
            }
            break;
        }
        chain
    }

    /// Builds the section tree from all `SectionHeader` blocks currently in
    /// the document, using the level/breadcrumb each header already carries.
    /// Invoked after the Section Hierarchy Builder processor has run and
    /// normalized levels; this method itself performs no normalization.
    #[must_use = "returns the assembled section tree"]
    pub fn assemble_sections(&self) -> SectionTree {
        let headers = self.iter(Kind::SectionHeader, true);
        let mut roots: Vec<SectionNode> = Vec::new();
        let mut stack: Vec<SectionNode> = Vec::new();

        for header in headers {
            let Some(level) = header.section_level() else { continue };
            let node = SectionNode {
                header_id: header.id.clone(),
                level,
                title: header.text.clone(),
                children: Vec::new(),
            };
            while let Some(top) = stack.last() {
                if top.level >= level {
                    let finished = stack.pop().unwrap();
                    push_into(&mut stack, &mut roots, finished);
                } else {
                    break;
                }
            }
            stack.push(node);
        }
        while let Some(finished) = stack.pop() {
            push_into(&mut stack, &mut roots, finished);
        }
        // `stack.pop()` above drains innermost-first; restore document order.
        roots.reverse();
        for root in &mut roots {
            reverse_children(root);
        }
        SectionTree { roots }
    }

    /// Resolves a breadcrumb (from a `SectionHeader`'s `breadcrumb` field)
    /// into the header ids it points at, skipping entries that no longer
    /// resolve (should not happen outside of a bug; invariant 2).
    #[must_use = "returns the breadcrumb trail as owned entries"]
    pub fn breadcrumb_titles(entries: &[BreadcrumbEntry]) -> Vec<String> {
        entries.iter().map(|e| e.title.clone()).collect()
    }
}

fn push_into(stack: &mut [SectionNode], roots: &mut Vec<SectionNode>, node: SectionNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        roots.push(node);
    }
}

fn reverse_children(node: &mut SectionNode) {
    node.children.reverse();
    for child in &mut node.children {
        reverse_children(child);
    }
}
