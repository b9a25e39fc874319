//! Renderer adapters projecting a [`crate::Document`] onto a concrete
//! serialized artifact (§4.9).
//!
//! Every renderer here is a pure projection: it borrows the `Document` and
//! returns an owned artifact without mutating it (testable property 6,
//! "renderer purity"). Three renderers are provided, matching §6's output
//! formats: [`markdown`] (GFM Markdown), [`json`] (hierarchical JSON), and
//! [`graph`] (flat vertex/edge JSON for graph-store ingestion).

pub mod graph;
pub mod json;
pub mod markdown;

pub use graph::{GraphEdge, GraphOptions, GraphSerializer, GraphVertex};
pub use json::{JsonOptions, JsonSerializer};
pub use markdown::{MarkdownOptions, MarkdownSerializer};
