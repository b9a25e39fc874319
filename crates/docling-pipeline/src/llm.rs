//! LLM enhancement (§5, §6 `llm.*`, §7's `ExternalCallFailed`): the one
//! in-pipeline seam that reaches an outbound network collaborator.
//!
//! The call itself is out of scope per `spec.md` §1 ("LLM enhancement calls"
//! are an external collaborator) — [`LlmClient`] is the narrow contract it
//! sits behind, mirroring [`crate::table::heuristic::TableLayoutModel`]'s
//! `Null*`-default pattern. [`LlmEnhancementProcessor`] owns everything that
//! *is* in scope: gating on `llm.enabled`, bounding concurrency to
//! `llm.concurrency` outbound calls at a time via a [`tokio::sync::Semaphore`]
//! (§5), enforcing `llm.per_call_timeout_s` per call, and the
//! exponential-backoff retry policy from §7 (base 1s, factor 2, cap 30s, max
//! 3 attempts) before recording `ExternalCallFailed` and falling back to the
//! block's existing heuristic content.

use std::sync::Arc;
use std::time::Duration;

use docling_core::{BlockId, DoclingError, Document, Kind, KindFilter, PipelineConfig, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cancellation::CancellationToken;
use crate::processor::Processor;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// The out-of-scope LLM-enhancement collaborator: given a block id and its
/// current text as a prompt, returns enhanced text.
///
/// Implementations run on a `spawn_blocking` worker, so a synchronous HTTP
/// client is as welcome here as an async one wrapped in `block_on`.
pub trait LlmClient: Send + Sync {
    /// Requests an enhancement for `block_id`'s content.
    ///
    /// # Errors
    /// Returns [`DoclingError::ExternalCallFailed`] (or any other error) on
    /// failure; the processor applies the §7 retry policy around this call.
    fn enhance(&self, block_id: &str, prompt: &str) -> Result<String>;
}

/// Default collaborator when no real LLM client is configured: always
/// declines, so `llm.enabled=true` with nothing wired in still exercises the
/// full skip/record-error path (S6) rather than silently no-op'ing.
pub struct NullLlmClient;

impl LlmClient for NullLlmClient {
    fn enhance(&self, block_id: &str, _prompt: &str) -> Result<String> {
        Err(DoclingError::ExternalCallFailed(format!(
            "no LLM client configured (block {block_id})"
        )))
    }
}

/// The `llm_enhancement` processor. Not part of
/// [`docling_core::config::default_processor_order`] — opt-in by adding
/// `"llm_enhancement"` to `pipeline.processors` alongside `llm.enabled=true`.
pub struct LlmEnhancementProcessor {
    client: Arc<dyn LlmClient>,
}

impl LlmEnhancementProcessor {
    /// Builds a processor around an injected LLM client.
    #[must_use = "creates a new processor"]
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

/// Kinds eligible for LLM enhancement: content whose text a caption/description
/// model can plausibly improve on the heuristic extraction.
fn enhancement_kinds() -> KindFilter {
    KindFilter::Set(vec![Kind::Picture, Kind::Figure, Kind::Equation])
}

impl Processor for LlmEnhancementProcessor {
    fn name(&self) -> &'static str {
        "llm_enhancement"
    }

    fn kinds(&self) -> KindFilter {
        enhancement_kinds()
    }

    fn run(&self, doc: &mut Document, config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
        if !config.llm.enabled {
            return Ok(());
        }

        let targets: Vec<(BlockId, String)> = doc
            .iter(self.kinds(), true)
            .into_iter()
            .map(|b| (b.id.clone(), b.text.clone()))
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| DoclingError::Other(anyhow::anyhow!(e)))?;

        let semaphore = Arc::new(Semaphore::new(config.llm.concurrency.max(1)));
        let timeout = Duration::from_secs(config.llm.per_call_timeout_s);
        let results = runtime.block_on(run_batch(targets, Arc::clone(&self.client), semaphore, timeout, token.clone()));

        // Mutation phase: single-threaded, applying the collected results in order.
        for (id, result) in results {
            let block = doc.get_mut(&id)?;
            match result {
                Ok(enhanced) => {
                    block.text = enhanced;
                    block.metadata.insert(
                        "llm_enhancement".to_string(),
                        serde_json::Value::String("applied".to_string()),
                    );
                }
                Err(DoclingError::Cancelled) => {}
                Err(err) => {
                    log::warn!("llm enhancement skipped for block {id}: {err}");
                    block.mark_recoverable_error(&err);
                    block.metadata.insert(
                        "llm_enhancement".to_string(),
                        serde_json::Value::String("skipped".to_string()),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Fans `targets` out over a `JoinSet`, `semaphore.acquire()` bounding how
/// many run concurrently; order of the returned `Vec` matches `targets`'
/// input order (not completion order), so the caller can apply results
/// deterministically.
async fn run_batch(
    targets: Vec<(BlockId, String)>,
    client: Arc<dyn LlmClient>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    cancelled: CancellationToken,
) -> Vec<(BlockId, Result<String>)> {
    let mut order = Vec::with_capacity(targets.len());
    let mut set = JoinSet::new();
    for (index, (id, prompt)) in targets.into_iter().enumerate() {
        order.push(id.clone());
        let semaphore = Arc::clone(&semaphore);
        let client = Arc::clone(&client);
        let cancelled = cancelled.clone();
        set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore is never closed during a processor run");
            let result = if cancelled.is_cancelled() {
                Err(DoclingError::Cancelled)
            } else {
                call_with_retry(Arc::clone(&client), &id, &prompt, timeout).await
            };
            (index, id, result)
        });
    }

    let mut slots: Vec<Option<Result<String>>> = (0..order.len()).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (index, _id, result) = joined.expect("llm enhancement task panicked");
        slots[index] = Some(result);
    }
    order
        .into_iter()
        .zip(slots)
        .map(|(id, slot)| (id, slot.expect("every spawned task reports back before join_next exhausts")))
        .collect()
}

/// Runs `client.enhance` under a per-call deadline (`timeout`), retrying up
/// to [`MAX_ATTEMPTS`] times with exponential backoff (base [`BASE_DELAY`],
/// factor 2, capped at [`MAX_DELAY`]) per §7's retry policy.
async fn call_with_retry(client: Arc<dyn LlmClient>, id: &BlockId, prompt: &str, timeout: Duration) -> Result<String> {
    let mut delay = BASE_DELAY;
    let mut last_err = DoclingError::ExternalCallFailed(format!("block {id} never attempted"));
    for attempt in 0..MAX_ATTEMPTS {
        match call_with_deadline(Arc::clone(&client), id, prompt, timeout).await {
            Ok(text) => return Ok(text),
            Err(err) => {
                last_err = err;
                if attempt + 1 < MAX_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                }
            }
        }
    }
    Err(last_err)
}

/// Runs a single attempt on the blocking thread pool, enforcing `timeout`
/// even if `client.enhance` itself never returns (a hung outbound call).
async fn call_with_deadline(client: Arc<dyn LlmClient>, id: &BlockId, prompt: &str, timeout: Duration) -> Result<String> {
    let id_str = id.0.clone();
    let prompt = prompt.to_string();
    let call = tokio::task::spawn_blocking(move || client.enhance(&id_str, &prompt));
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(DoclingError::ExternalCallFailed(format!(
            "LLM call for block {id} panicked: {join_err}"
        ))),
        Err(_elapsed) => Err(DoclingError::ExternalCallFailed(format!("LLM call for block {id} timed out"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docling_core::{Block, BlockId as CoreBlockId, DocumentMetadata, Kind as CoreKind, Page, Polygon, Size, TextExtractionMethod};

    struct EchoClient;
    impl LlmClient for EchoClient {
        fn enhance(&self, _block_id: &str, prompt: &str) -> Result<String> {
            Ok(format!("{prompt} [enhanced]"))
        }
    }

    struct AlwaysFailClient;
    impl LlmClient for AlwaysFailClient {
        fn enhance(&self, block_id: &str, _prompt: &str) -> Result<String> {
            Err(DoclingError::ExternalCallFailed(format!("unreachable for {block_id}")))
        }
    }

    fn doc_with_one_figure() -> (Document, BlockId) {
        let mut doc = Document::new(DocumentMetadata::default());
        let figure = Block::new(CoreBlockId::new(1, CoreKind::Figure, 0), CoreKind::Figure, Polygon::from_rect(0.0, 0.0, 10.0, 10.0), 1)
            .with_text("a chart")
            .with_extraction_method(TextExtractionMethod::Native);
        let id = doc.register_block(figure).unwrap();
        doc.add_page(Page {
            page_no: 1,
            size: Size::new(612.0, 792.0),
            top_level_blocks: vec![id.clone()],
            raster_ref: None,
        });
        (doc, id)
    }

    #[test]
    fn disabled_by_default_leaves_blocks_untouched() {
        let (mut doc, id) = doc_with_one_figure();
        let config = PipelineConfig::default();
        assert!(!config.llm.enabled);
        let processor = LlmEnhancementProcessor::new(Arc::new(EchoClient));
        processor.run(&mut doc, &config, &CancellationToken::new()).unwrap();
        assert_eq!(doc.get(&id).unwrap().text, "a chart");
    }

    #[test]
    fn successful_call_rewrites_text_and_records_applied() {
        let (mut doc, id) = doc_with_one_figure();
        let mut config = PipelineConfig::default();
        config.llm.enabled = true;
        let processor = LlmEnhancementProcessor::new(Arc::new(EchoClient));
        processor.run(&mut doc, &config, &CancellationToken::new()).unwrap();
        let block = doc.get(&id).unwrap();
        assert_eq!(block.text, "a chart [enhanced]");
        assert_eq!(
            block.metadata.get("llm_enhancement").and_then(|v| v.as_str()),
            Some("applied")
        );
    }

    #[test]
    fn unreachable_client_skips_and_records_external_call_failed() {
        let (mut doc, id) = doc_with_one_figure();
        let mut config = PipelineConfig::default();
        config.llm.enabled = true;
        let processor = LlmEnhancementProcessor::new(Arc::new(AlwaysFailClient));
        processor.run(&mut doc, &config, &CancellationToken::new()).unwrap();
        let block = doc.get(&id).unwrap();
        assert_eq!(block.text, "a chart", "falls back to original text");
        assert_eq!(
            block.metadata.get("llm_enhancement").and_then(|v| v.as_str()),
            Some("skipped")
        );
        assert_eq!(block.metadata.get("error_code").and_then(|v| v.as_str()), Some("ExternalCallFailed"));
    }

    #[test]
    fn cancelled_token_leaves_block_untouched() {
        let (mut doc, id) = doc_with_one_figure();
        let mut config = PipelineConfig::default();
        config.llm.enabled = true;
        let token = CancellationToken::new();
        token.cancel();
        let processor = LlmEnhancementProcessor::new(Arc::new(EchoClient));
        processor.run(&mut doc, &config, &token).unwrap();
        let block = doc.get(&id).unwrap();
        assert_eq!(block.text, "a chart");
        assert!(block.metadata.get("llm_enhancement").is_none());
    }

    #[test]
    fn null_client_is_the_default_collaborator() {
        let err = NullLlmClient.enhance("1_figure_0", "x").unwrap_err();
        assert!(matches!(err, DoclingError::ExternalCallFailed(_)));
    }
}
