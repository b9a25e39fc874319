//! The processor framework (§4.3): an ordered, type-filtered transformation
//! over an in-memory [`Document`].
//!
//! A [`Processor`] declares the [`KindFilter`] it operates on and a `run`
//! method; the [`Pipeline`] executes a configured ordered list sequentially.
//! Execution is single-threaded at the pipeline level — one processor runs to
//! completion before the next starts — but a processor may parallelize its
//! own internal work (see `crate::table` for the canonical example) as long
//! as the mutation phase stays single-threaded and deterministic.
//!
//! Per the design notes in §9 ("global registries... replace with an
//! explicit factory table"), there is no `inventory`/`ctor`-style
//! auto-registration. [`Pipeline::new`] takes an explicit factory map from
//! processor name to constructor; unknown names in `config.processors` are a
//! caller error, not a silently skipped no-op.

use docling_core::{DoclingError, Document, KindFilter, PipelineConfig, Result};
use std::collections::HashMap;

use crate::cancellation::CancellationToken;

/// A single ordered transformation over the full [`Document`].
///
/// Implementations filter via `doc.iter(processor.kinds(), true)` and mutate
/// in place. A processor must not assume it is the only one ever run, nor
/// that the document was produced by any particular provider.
pub trait Processor: Send + Sync {
    /// Stable name matched against `pipeline.processors` entries (§6).
    fn name(&self) -> &'static str;

    /// The kinds this processor reads. Purely advisory/documentary for now —
    /// callers may still use `Document::iter` with a narrower filter inside
    /// `run` — but it is what doc tooling and tests key off of.
    fn kinds(&self) -> KindFilter;

    /// Runs one pass over `doc`, mutating in place.
    ///
    /// # Errors
    /// Fatal errors (per the §7 taxonomy) propagate and abort the pipeline.
    /// Recoverable conditions should be recorded on the affected block's
    /// metadata via [`docling_core::Block::mark_recoverable_error`] and
    /// `Ok(())` returned.
    fn run(&self, doc: &mut Document, config: &PipelineConfig, token: &CancellationToken) -> Result<()>;
}

/// Constructs a boxed [`Processor`] from a `&PipelineConfig`. Kept as a plain
/// function pointer (not a trait) since processors in this crate are
/// stateless beyond what `config` already carries.
pub type ProcessorFactory = fn(&PipelineConfig) -> Box<dyn Processor>;

/// The ordered pipeline executor.
///
/// Built from an explicit factory table (§9) rather than a global registry,
/// so tests can construct a `Pipeline` with exactly the processors they want
/// to exercise, in any order, without pulling in the rest.
pub struct Pipeline {
    stages: Vec<Box<dyn Processor>>,
}

impl Pipeline {
    /// Resolves `config.processors` against `factories`, in order, building
    /// the stage list.
    ///
    /// # Errors
    /// Returns [`DoclingError::Other`] naming the first processor in
    /// `config.processors` with no entry in `factories`.
    pub fn new(config: &PipelineConfig, factories: &HashMap<&'static str, ProcessorFactory>) -> Result<Self> {
        let mut stages = Vec::with_capacity(config.processors.len());
        for name in &config.processors {
            let factory = factories
                .get(name.as_str())
                .ok_or_else(|| DoclingError::Other(anyhow::anyhow!("unknown processor: '{name}'")))?;
            stages.push(factory(config));
        }
        Ok(Self { stages })
    }

    /// Builds a pipeline from an already-constructed, explicitly ordered
    /// stage list, bypassing the factory table. Useful for tests that want a
    /// one-off processor or a subset not named in `config.processors`.
    #[must_use = "creates a new pipeline"]
    pub fn from_stages(stages: Vec<Box<dyn Processor>>) -> Self {
        Self { stages }
    }

    /// Runs every stage in order against `doc`.
    ///
    /// On a fatal error from any stage, the pipeline aborts immediately with
    /// full context (processor name, cause); on cancellation it stops after
    /// the in-flight stage returns, leaving `doc` in the state that stage
    /// left it in (each stage itself must have already honored the token).
    ///
    /// # Errors
    /// Propagates the first fatal error, wrapped with the failing
    /// processor's name. Returns [`DoclingError::Cancelled`] if `token` was
    /// cancelled before or during the run.
    pub fn run(&self, doc: &mut Document, config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
        for stage in &self.stages {
            if token.is_cancelled() {
                return Err(DoclingError::Cancelled);
            }
            stage.run(doc, config, token).map_err(|err| {
                if err.is_fatal() {
                    DoclingError::Other(anyhow::anyhow!("processor '{}' failed: {err}", stage.name()))
                } else {
                    err
                }
            })?;
        }
        doc.collect_validation_issues();
        Ok(())
    }

    /// Names of the stages in execution order, for diagnostics and tests.
    #[must_use = "returns the ordered stage names"]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::Kind;

    struct NoOp;
    impl Processor for NoOp {
        fn name(&self) -> &'static str {
            "noop"
        }
        fn kinds(&self) -> KindFilter {
            KindFilter::Any
        }
        fn run(&self, _doc: &mut Document, _config: &PipelineConfig, _token: &CancellationToken) -> Result<()> {
            Ok(())
        }
    }

    struct AlwaysFails;
    impl Processor for AlwaysFails {
        fn name(&self) -> &'static str {
            "fails"
        }
        fn kinds(&self) -> KindFilter {
            Kind::Table.into()
        }
        fn run(&self, _doc: &mut Document, _config: &PipelineConfig, _token: &CancellationToken) -> Result<()> {
            Err(DoclingError::UnknownBlockId("boom".into()))
        }
    }

    #[test]
    fn unknown_processor_name_is_an_error() {
        let config = PipelineConfig {
            processors: vec!["does_not_exist".into()],
            ..PipelineConfig::default()
        };
        let factories: HashMap<&'static str, ProcessorFactory> = HashMap::new();
        assert!(Pipeline::new(&config, &factories).is_err());
    }

    #[test]
    fn stages_run_in_declared_order() {
        let pipeline = Pipeline::from_stages(vec![Box::new(NoOp), Box::new(NoOp)]);
        assert_eq!(pipeline.stage_names(), vec!["noop", "noop"]);
        let mut doc = Document::new(docling_core::DocumentMetadata::default());
        let config = PipelineConfig::default();
        let token = CancellationToken::new();
        assert!(pipeline.run(&mut doc, &config, &token).is_ok());
    }

    #[test]
    fn fatal_error_aborts_and_names_the_processor() {
        let pipeline = Pipeline::from_stages(vec![Box::new(NoOp), Box::new(AlwaysFails)]);
        let mut doc = Document::new(docling_core::DocumentMetadata::default());
        let config = PipelineConfig::default();
        let token = CancellationToken::new();
        let err = pipeline.run(&mut doc, &config, &token).unwrap_err();
        assert!(err.to_string().contains("fails"));
    }

    #[test]
    fn cancelled_token_short_circuits_before_first_stage() {
        let pipeline = Pipeline::from_stages(vec![Box::new(NoOp)]);
        let mut doc = Document::new(docling_core::DocumentMetadata::default());
        let config = PipelineConfig::default();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            pipeline.run(&mut doc, &config, &token),
            Err(DoclingError::Cancelled)
        ));
    }
}
