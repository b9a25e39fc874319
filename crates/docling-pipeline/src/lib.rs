//! # docling-pipeline
//!
//! The ordered processor chain that recovers structure from a raw
//! [`docling_core::Document`]: reading order and paragraph joining, section
//! hierarchy, code-language detection, table extraction, and the narrower
//! equations/lists/references processors.
//!
//! [`processor`] defines the [`Processor`] trait and the sequential
//! [`Pipeline`] executor; [`default_factories`] wires every processor this
//! crate ships into the explicit factory table [`Pipeline::new`] expects, per
//! §9's "replace global registries with an explicit factory table passed into
//! the Pipeline constructor."
//!
//! ## Module organization
//!
//! - [`processor`] - the `Processor` trait and `Pipeline` executor
//! - [`cancellation`] - `CancellationToken` / `Budget`
//! - [`text_layout`] - paragraph joining, header/footer stripping, reading order (§4.4)
//! - [`sections`] - the section hierarchy builder (§4.5)
//! - [`code_lang`] - code language detection (§4.6)
//! - [`table`] - the table subsystem (§4.7)
//! - [`equations`], [`lists`], [`references`] - the narrower content processors (§4.8)
//! - [`llm`] - the LLM-enhancement external-collaborator seam (§5, §6 `llm.*`)

pub mod cancellation;
pub mod code_lang;
pub mod equations;
pub mod lists;
pub mod llm;
pub mod processor;
pub mod references;
pub mod sections;
pub mod table;
pub mod text_layout;

use std::collections::HashMap;
use std::sync::Arc;

pub use cancellation::{Budget, CancellationToken};
pub use code_lang::CodeLanguageProcessor;
pub use equations::EquationsProcessor;
pub use lists::ListsProcessor;
pub use llm::{LlmClient, LlmEnhancementProcessor, NullLlmClient};
pub use processor::{Pipeline, Processor, ProcessorFactory};
pub use references::ReferencesProcessor;
pub use sections::SectionHierarchyProcessor;
pub use table::heuristic::{NullLayoutModel, TableLayoutModel};
pub use table::TableExtractionProcessor;
pub use text_layout::TextLayoutProcessor;

/// The factory table for every processor this crate ships, keyed by the
/// stable `name()` each declares. Matches [`docling_core::PipelineConfig`]'s
/// default processor order (`text_layout`, `section_hierarchy`,
/// `code_language`, `table_extraction`, `equations`, `lists`, `references`)
/// plus the opt-in `llm_enhancement` stage, which a caller adds to
/// `config.processors` explicitly when `llm.enabled` is set.
///
/// Built fresh per call rather than cached in a `once_cell`, since
/// `table_extraction` needs an injected layout-model collaborator and
/// `llm_enhancement` an injected LLM client; callers that don't have either
/// get the `Null*` defaults, matching the rest of this crate's
/// external-collaborator pattern.
#[must_use = "returns the default processor factory table"]
pub fn default_factories() -> HashMap<&'static str, ProcessorFactory> {
    let mut factories: HashMap<&'static str, ProcessorFactory> = HashMap::new();
    factories.insert("text_layout", |_config| Box::new(TextLayoutProcessor));
    factories.insert("section_hierarchy", |_config| Box::new(SectionHierarchyProcessor));
    factories.insert("code_language", |_config| Box::new(CodeLanguageProcessor));
    factories.insert("table_extraction", |_config| Box::new(TableExtractionProcessor::default()));
    factories.insert("equations", |_config| Box::new(EquationsProcessor));
    factories.insert("lists", |_config| Box::new(ListsProcessor));
    factories.insert("references", |_config| Box::new(ReferencesProcessor));
    factories.insert("llm_enhancement", |_config| {
        Box::new(LlmEnhancementProcessor::new(Arc::new(NullLlmClient)))
    });
    factories
}

/// Builds a [`Pipeline`] from `config.processors` against [`default_factories`].
///
/// # Errors
/// Propagates [`docling_core::DoclingError::Other`] naming the first
/// processor in `config.processors` with no entry in the factory table.
pub fn default_pipeline(config: &docling_core::PipelineConfig) -> docling_core::Result<Pipeline> {
    Pipeline::new(config, &default_factories())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::PipelineConfig;

    #[test]
    fn default_factories_cover_the_default_processor_order() {
        let factories = default_factories();
        for name in &PipelineConfig::default().processors {
            assert!(factories.contains_key(name.as_str()), "missing factory for '{name}'");
        }
    }

    #[test]
    fn default_pipeline_builds_from_default_config() {
        let config = PipelineConfig::default();
        let pipeline = default_pipeline(&config).unwrap();
        assert_eq!(pipeline.stage_names(), config.processors);
    }

    #[test]
    fn llm_enhancement_factory_is_available_but_not_in_default_order() {
        let factories = default_factories();
        assert!(factories.contains_key("llm_enhancement"));
        assert!(!PipelineConfig::default().processors.contains(&"llm_enhancement".to_string()));
    }
}
