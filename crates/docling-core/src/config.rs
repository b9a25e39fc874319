//! Explicit pipeline configuration.
//!
//! Per the design notes in §9, dynamic config dictionaries are replaced with
//! an explicit record enumerating the closed set of options from §6. Loading
//! untyped config (TOML/JSON/env) into this struct is left to the CLI layer;
//! [`PipelineConfig::from_map`] is the one seam that accepts a loosely typed
//! map and rejects unknown keys, matching "unknown keys reject at load time."

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Policy for handling a section-level jump of more than one level (§4.5 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonotonicityPolicy {
    /// Demote the jumping header to `parent.level + 1` (the default).
    Demote,
    /// Insert a synthetic header to fill the missing level.
    InsertSynthetic,
}

impl Default for MonotonicityPolicy {
    fn default() -> Self {
        Self::Demote
    }
}

/// Table-subsystem options (§6 `table.*`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Minimum `combined` score to accept a candidate outright (default 0.75).
    pub accept_threshold: f64,
    /// `combined` score at which the parameter sweep stops early (default 0.9).
    pub early_exit_threshold: f64,
    /// Hard cap on sweep candidates per table (default 8).
    pub max_candidates: usize,
    /// Whether cross-boundary merging (§4.7.5) is enabled (default true).
    pub enable_merging: bool,
    /// Minimum viable score; below this the table is emitted degraded (default 0.4).
    pub min_viable_score: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.75,
            early_exit_threshold: 0.9,
            max_candidates: 8,
            enable_merging: true,
            min_viable_score: 0.4,
        }
    }
}

/// Code-processor options (§6 `code.*`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Whether language detection runs at all (default true).
    pub enable_language_detection: bool,
    /// Per-block detection time budget in milliseconds (default 1000).
    pub detection_timeout_ms: u64,
    /// Confidence floor below which `language` is left `None` (default 0.6).
    pub min_confidence: f64,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            enable_language_detection: true,
            detection_timeout_ms: 1000,
            min_confidence: 0.6,
        }
    }
}

/// Section-builder options (§6 `sections.*`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionsConfig {
    /// Policy applied when raw levels violate monotonicity.
    pub monotonicity_policy: MonotonicityPolicy,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            monotonicity_policy: MonotonicityPolicy::Demote,
        }
    }
}

/// LLM-enhancement options (§6 `llm.*`). The calls themselves are external;
/// this only governs whether/how the pipeline invokes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether any processor may invoke LLM enhancement (default false).
    pub enabled: bool,
    /// Bounded semaphore size for concurrent outbound calls (default 3).
    pub concurrency: usize,
    /// Per-call deadline in seconds (default 120).
    pub per_call_timeout_s: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            concurrency: 3,
            per_call_timeout_s: 120,
        }
    }
}

/// Top-level pipeline configuration, enumerating exactly the options
/// recognized by §6. There is no escape hatch for arbitrary keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ordered list of processor names to run (`pipeline.processors`).
    pub processors: Vec<String>,
    /// Worker-pool size for data-parallel work inside a processor
    /// (`pipeline.parallelism`, default `min(4, cores)`).
    pub parallelism: usize,
    /// Table subsystem options.
    pub table: TableConfig,
    /// Code processor options.
    pub code: CodeConfig,
    /// Section builder options.
    pub sections: SectionsConfig,
    /// LLM enhancement options.
    pub llm: LlmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processors: default_processor_order(),
            parallelism: default_parallelism(),
            table: TableConfig::default(),
            code: CodeConfig::default(),
            sections: SectionsConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

/// Default processor order: text/reading-order first (so downstream
/// processors see joined paragraphs), then structure recovery, then content
/// enhancement passes.
fn default_processor_order() -> Vec<String> {
    vec![
        "text_layout".to_string(),
        "section_hierarchy".to_string(),
        "code_language".to_string(),
        "table_extraction".to_string(),
        "equations".to_string(),
        "lists".to_string(),
        "references".to_string(),
    ]
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(4)
}

/// Error returned by [`PipelineConfig::from_map`] for a key outside the
/// closed set documented in §6.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized configuration key: '{0}'")]
pub struct UnknownConfigKey(pub String);

impl PipelineConfig {
    /// Builds a config from a loosely typed map (as loaded from CLI flags,
    /// TOML, or env), rejecting any key outside the closed set in §6.
    ///
    /// # Errors
    /// Returns [`UnknownConfigKey`] naming the first unrecognized key.
    pub fn from_map(
        map: &HashMap<String, serde_json::Value>,
    ) -> std::result::Result<Self, UnknownConfigKey> {
        const RECOGNIZED: &[&str] = &[
            "pipeline.processors",
            "pipeline.parallelism",
            "table.accept_threshold",
            "table.early_exit_threshold",
            "table.max_candidates",
            "table.enable_merging",
            "code.enable_language_detection",
            "code.detection_timeout_ms",
            "code.min_confidence",
            "sections.monotonicity_policy",
            "llm.enabled",
            "llm.concurrency",
            "llm.per_call_timeout_s",
        ];
        for key in map.keys() {
            if !RECOGNIZED.contains(&key.as_str()) {
                return Err(UnknownConfigKey(key.clone()));
            }
        }

        let mut config = Self::default();
        if let Some(v) = map.get("pipeline.processors").and_then(|v| v.as_array()) {
            config.processors = v
                .iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect();
        }
        if let Some(v) = map.get("pipeline.parallelism").and_then(serde_json::Value::as_u64) {
            config.parallelism = v as usize;
        }
        if let Some(v) = map.get("table.accept_threshold").and_then(serde_json::Value::as_f64) {
            config.table.accept_threshold = v;
        }
        if let Some(v) = map
            .get("table.early_exit_threshold")
            .and_then(serde_json::Value::as_f64)
        {
            config.table.early_exit_threshold = v;
        }
        if let Some(v) = map.get("table.max_candidates").and_then(serde_json::Value::as_u64) {
            config.table.max_candidates = v as usize;
        }
        if let Some(v) = map.get("table.enable_merging").and_then(serde_json::Value::as_bool) {
            config.table.enable_merging = v;
        }
        if let Some(v) = map
            .get("code.enable_language_detection")
            .and_then(serde_json::Value::as_bool)
        {
            config.code.enable_language_detection = v;
        }
        if let Some(v) = map
            .get("code.detection_timeout_ms")
            .and_then(serde_json::Value::as_u64)
        {
            config.code.detection_timeout_ms = v;
        }
        if let Some(v) = map.get("code.min_confidence").and_then(serde_json::Value::as_f64) {
            config.code.min_confidence = v;
        }
        if let Some(v) = map
            .get("sections.monotonicity_policy")
            .and_then(|v| v.as_str())
        {
            config.sections.monotonicity_policy = match v {
                "insert_synthetic" => MonotonicityPolicy::InsertSynthetic,
                _ => MonotonicityPolicy::Demote,
            };
        }
        if let Some(v) = map.get("llm.enabled").and_then(serde_json::Value::as_bool) {
            config.llm.enabled = v;
        }
        if let Some(v) = map.get("llm.concurrency").and_then(serde_json::Value::as_u64) {
            config.llm.concurrency = v as usize;
        }
        if let Some(v) = map
            .get("llm.per_call_timeout_s")
            .and_then(serde_json::Value::as_u64)
        {
            config.llm.per_call_timeout_s = v;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = PipelineConfig::default();
        assert_eq!(config.table.accept_threshold, 0.75);
        assert_eq!(config.table.early_exit_threshold, 0.9);
        assert_eq!(config.table.max_candidates, 8);
        assert!(config.table.enable_merging);
        assert_eq!(config.code.min_confidence, 0.6);
        assert_eq!(config.code.detection_timeout_ms, 1000);
        assert_eq!(config.llm.concurrency, 3);
        assert!(!config.llm.enabled);
    }

    #[test]
    fn from_map_rejects_unknown_keys() {
        let mut map = HashMap::new();
        map.insert("bogus.key".to_string(), serde_json::json!(true));
        let err = PipelineConfig::from_map(&map).unwrap_err();
        assert_eq!(err.0, "bogus.key");
    }

    #[test]
    fn from_map_overrides_recognized_keys() {
        let mut map = HashMap::new();
        map.insert("table.accept_threshold".to_string(), serde_json::json!(0.5));
        map.insert("llm.enabled".to_string(), serde_json::json!(true));
        let config = PipelineConfig::from_map(&map).unwrap();
        assert_eq!(config.table.accept_threshold, 0.5);
        assert!(config.llm.enabled);
        // Untouched keys keep their defaults.
        assert_eq!(config.table.max_candidates, 8);
    }
}
