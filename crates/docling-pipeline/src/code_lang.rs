//! Code language detection (§4.6): a two-stage detector run per `Code`
//! block.
//!
//! 1. **Syntactic.** For code blocks long enough that a parse is meaningful,
//!    each candidate grammar is tried via `tree-sitter`; a clean parse (no
//!    `ERROR` nodes) at a sufficient node density is accepted, with
//!    confidence derived from parse completeness. Short snippets skip this
//!    stage outright — a tree-sitter grammar will happily produce a
//!    low-node, error-free "parse" of a two-line fragment in more than one
//!    language, which is not the kind of signal §4.6 means by "parse
//!    completeness".
//! 2. **Heuristic fallback.** A weighted keyword/shebang/marker scorer per
//!    language. A score `>= 0.6` wins; ties are broken by the number of
//!    language-unique markers present, so that e.g. C++ (`#include`, `::`,
//!    `template<`) and TypeScript (`interface`, `readonly`, `: type`) are
//!    never confused even though both can contain generic-looking braces.
//!
//! Detection is capped at `code.detection_timeout_ms` per block; on timeout
//! the block's `language` is left `None` (§7 `LanguageDetectionTimeout`,
//! recoverable).

use std::time::{Duration, Instant};

use docling_core::{Block, BlockPayload, DoclingError, Document, Kind, KindFilter, PipelineConfig, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cancellation::CancellationToken;
use crate::processor::Processor;

/// The `code_language` processor (§4.6).
pub struct CodeLanguageProcessor;

impl Processor for CodeLanguageProcessor {
    fn name(&self) -> &'static str {
        "code_language"
    }

    fn kinds(&self) -> KindFilter {
        Kind::Code.into()
    }

    fn run(&self, doc: &mut Document, config: &PipelineConfig, token: &CancellationToken) -> Result<()> {
        if !config.code.enable_language_detection {
            return Ok(());
        }
        // Snapshot (id, text) for every `Code` block: the detection work
        // itself (syntactic parse + heuristic scoring) has no dependency on
        // document state beyond the block's own text, so it's the kind of
        // per-block data-parallel work §5 calls out for a bounded worker
        // pool. Results are reassembled by id before the single mutation
        // pass that follows, preserving the single-writer invariant.
        let snapshot: Vec<(docling_core::BlockId, String)> =
            doc.iter(Kind::Code, true).into_iter().map(|b| (b.id.clone(), b.text.clone())).collect();
        if snapshot.is_empty() {
            return Ok(());
        }

        let timeout = Duration::from_millis(config.code.detection_timeout_ms);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism.max(1))
            .build()
            .map_err(|e| docling_core::DoclingError::Other(e.into()))?;
        let results: Vec<_> = pool.install(|| {
            use rayon::prelude::*;
            snapshot
                .par_iter()
                .map(|(id, text)| (id.clone(), detect_language(text, timeout)))
                .collect()
        });

        for (id, detection) in results {
            if token.is_cancelled() {
                return Ok(());
            }
            let block = doc.get_mut(&id)?;
            match detection {
                Some(d) if d.confidence >= config.code.min_confidence => {
                    block.payload = BlockPayload::Code {
                        language: Some(d.language.to_string()),
                        language_confidence: d.confidence,
                    };
                }
                Some(d) => {
                    // Below the confidence floor: language stays unknown, but
                    // the near-miss confidence is still recorded (§4.6: "null
                    // language acceptable when below confidence floor").
                    block.payload = BlockPayload::Code {
                        language: None,
                        language_confidence: d.confidence,
                    };
                }
                None => {
                    block.payload = BlockPayload::Code {
                        language: None,
                        language_confidence: 0.0,
                    };
                    block.mark_recoverable_error(&DoclingError::LanguageDetectionTimeout(id.to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Result of a successful detection attempt (confidence may still be below
/// the configured floor; the caller decides whether to surface it).
struct Detection {
    language: &'static str,
    confidence: f64,
}

/// Minimum text length before the syntactic stage is attempted at all.
/// Below this, a grammar's "clean, error-free parse" is not a meaningful
/// completeness signal — see module docs.
const MIN_LEN_FOR_SYNTACTIC: usize = 80;

/// Runs the two-stage detector with an overall `timeout` budget.
///
/// Returns `None` only when the budget is exhausted before either stage
/// produces a candidate (the `LanguageDetectionTimeout` case); otherwise
/// returns the best candidate found, whatever its confidence.
fn detect_language(text: &str, timeout: Duration) -> Option<Detection> {
    let deadline = Instant::now() + timeout;
    if text.trim().is_empty() {
        return Some(Detection {
            language: "",
            confidence: 0.0,
        });
    }

    if text.len() >= MIN_LEN_FOR_SYNTACTIC && Instant::now() < deadline {
        if let Some(detection) = syntactic_detect(text) {
            return Some(detection);
        }
    }

    if Instant::now() >= deadline {
        return None;
    }
    Some(heuristic_detect(text))
}

/// Syntactic stage: parses `text` against every registered grammar, keeping
/// clean (error-free) parses and scoring them by node density. When more
/// than one grammar parses cleanly, the cpp/typescript marker check below
/// disambiguates; if the ambiguity can't be resolved that way, falls through
/// to the heuristic stage (returns `None`).
fn syntactic_detect(text: &str) -> Option<Detection> {
    let grammars: &[(&str, tree_sitter::Language)] = &[
        ("rust", tree_sitter_rust::LANGUAGE.into()),
        ("python", tree_sitter_python::LANGUAGE.into()),
        ("javascript", tree_sitter_javascript::LANGUAGE.into()),
        ("typescript", tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        ("cpp", tree_sitter_cpp::LANGUAGE.into()),
        ("c", tree_sitter_c::LANGUAGE.into()),
        ("go", tree_sitter_go::LANGUAGE.into()),
        ("java", tree_sitter_java::LANGUAGE.into()),
    ];

    let mut clean: Vec<(&'static str, f64)> = Vec::new();
    for (name, language) in grammars {
        let mut parser = tree_sitter::Parser::new();
        if parser.set_language(language).is_err() {
            continue;
        }
        let Some(tree) = parser.parse(text, None) else { continue };
        let root = tree.root_node();
        if root.has_error() {
            continue;
        }
        let node_count = count_named_nodes(&root);
        let density = node_count as f64 / text.len().max(1) as f64;
        if density < 0.05 || node_count < 3 {
            continue;
        }
        let confidence = (0.6 + density.min(0.4)).min(0.99);
        clean.push((name, confidence));
    }

    if clean.is_empty() {
        return None;
    }
    if clean.len() == 1 {
        let (language, confidence) = clean[0];
        return Some(Detection { language, confidence });
    }

    // Ambiguous across multiple grammars: require a language-unique marker
    // to break the tie, same rule as the heuristic stage.
    clean.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (language, confidence) in &clean {
        if has_unique_marker(language, text) {
            return Some(Detection {
                language,
                confidence: *confidence,
            });
        }
    }
    None
}

fn count_named_nodes(node: &tree_sitter::Node) -> usize {
    let mut count = 1;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        count += count_named_nodes(&child);
    }
    count
}

/// Weighted pattern: `(regex, weight, is_unique_marker)`. `weight`s for a
/// language are normalized by their sum, so the max achievable score is 1.0.
struct Pattern {
    re: &'static Lazy<Regex>,
    weight: f64,
    unique: bool,
}

macro_rules! pat {
    ($re:expr) => {
        Lazy::new(|| Regex::new($re).unwrap())
    };
}

static CPP_INCLUDE: Lazy<Regex> = pat!(r"#include\s*[<\x22]");
static CPP_SCOPE: Lazy<Regex> = pat!(r"\w+::\w+");
static CPP_TEMPLATE: Lazy<Regex> = pat!(r"template\s*<");
static CPP_STD: Lazy<Regex> = pat!(r"\bstd::");
static CPP_MAIN: Lazy<Regex> = pat!(r"\bint\s+main\s*\(");

static C_INCLUDE: Lazy<Regex> = pat!(r"#include\s*[<\x22]");
static C_MAIN: Lazy<Regex> = pat!(r"\bint\s+main\s*\(");
static C_PRINTF: Lazy<Regex> = pat!(r"\bprintf\s*\(");
static C_MALLOC: Lazy<Regex> = pat!(r"\bmalloc\s*\(");
static C_STRUCT: Lazy<Regex> = pat!(r"\bstruct\s+\w+\s*\{");

static TS_INTERFACE: Lazy<Regex> = pat!(r"\binterface\s+\w+\s*\{");
static TS_READONLY: Lazy<Regex> = pat!(r"\breadonly\s+\w+");
static TS_TYPE_ANNOTATION: Lazy<Regex> = pat!(r":\s*(number|string|boolean|void|any)\b");
static TS_ARROW: Lazy<Regex> = pat!(r"=>");
static TS_EXPORT: Lazy<Regex> = pat!(r"\bexport\s+(interface|type|class|const)\b");

static JS_FUNCTION: Lazy<Regex> = pat!(r"\bfunction\s*\w*\s*\(");
static JS_ARROW: Lazy<Regex> = pat!(r"=>");
static JS_CONST_LET: Lazy<Regex> = pat!(r"\b(const|let|var)\s+\w+\s*=");
static JS_REQUIRE: Lazy<Regex> = pat!(r"\brequire\s*\(");
static JS_CONSOLE: Lazy<Regex> = pat!(r"console\.(log|error|warn)\s*\(");

static PY_DEF: Lazy<Regex> = pat!(r"\bdef\s+\w+\s*\(");
static PY_IMPORT: Lazy<Regex> = pat!(r"^\s*(import|from)\s+\w+");
static PY_SELF: Lazy<Regex> = pat!(r"\bself\b");
static PY_ELIF: Lazy<Regex> = pat!(r"\belif\b");
static PY_SHEBANG: Lazy<Regex> = pat!(r"^#!.*python");

static RUST_FN: Lazy<Regex> = pat!(r"\bfn\s+\w+\s*\(");
static RUST_LET_MUT: Lazy<Regex> = pat!(r"\blet\s+mut\b");
static RUST_IMPL: Lazy<Regex> = pat!(r"\bimpl\b");
static RUST_ARROW: Lazy<Regex> = pat!(r"->\s*\w");
static RUST_MACRO: Lazy<Regex> = pat!(r"\w+!\s*\(");

static GO_FUNC: Lazy<Regex> = pat!(r"\bfunc\s+\w*\s*\(");
static GO_PACKAGE: Lazy<Regex> = pat!(r"^\s*package\s+\w+");
static GO_SHORT_DECL: Lazy<Regex> = pat!(r":=");
static GO_IMPORT: Lazy<Regex> = pat!(r"\bimport\s*\(");

static JAVA_PUBLIC_CLASS: Lazy<Regex> = pat!(r"\bpublic\s+class\s+\w+");
static JAVA_MAIN: Lazy<Regex> = pat!(r"public\s+static\s+void\s+main\s*\(");
static JAVA_SYSOUT: Lazy<Regex> = pat!(r"System\.out\.println\s*\(");
static JAVA_PRIVATE: Lazy<Regex> = pat!(r"\bprivate\s+\w+");

fn language_patterns(language: &str) -> &'static [Pattern] {
    macro_rules! patterns {
        ($($re:expr, $w:expr, $u:expr);+ $(;)?) => {
            &[$(Pattern { re: &$re, weight: $w, unique: $u }),+]
        };
    }
    match language {
        "cpp" => patterns![
            CPP_INCLUDE, 0.30, true;
            CPP_SCOPE, 0.20, true;
            CPP_TEMPLATE, 0.20, true;
            CPP_STD, 0.15, false;
            CPP_MAIN, 0.15, false;
        ],
        "c" => patterns![
            C_INCLUDE, 0.25, false;
            C_MAIN, 0.20, false;
            C_PRINTF, 0.20, false;
            C_MALLOC, 0.15, false;
            C_STRUCT, 0.20, false;
        ],
        "typescript" => patterns![
            TS_INTERFACE, 0.35, true;
            TS_READONLY, 0.30, true;
            TS_TYPE_ANNOTATION, 0.20, true;
            TS_ARROW, 0.10, false;
            TS_EXPORT, 0.05, false;
        ],
        "javascript" => patterns![
            JS_FUNCTION, 0.25, false;
            JS_ARROW, 0.20, false;
            JS_CONST_LET, 0.20, false;
            JS_REQUIRE, 0.15, false;
            JS_CONSOLE, 0.20, false;
        ],
        "python" => patterns![
            PY_DEF, 0.25, true;
            PY_IMPORT, 0.15, false;
            PY_SELF, 0.20, false;
            PY_ELIF, 0.10, false;
            PY_SHEBANG, 0.30, true;
        ],
        "rust" => patterns![
            RUST_FN, 0.25, true;
            RUST_LET_MUT, 0.20, false;
            RUST_IMPL, 0.20, true;
            RUST_ARROW, 0.15, false;
            RUST_MACRO, 0.20, false;
        ],
        "go" => patterns![
            GO_FUNC, 0.25, false;
            GO_PACKAGE, 0.25, true;
            GO_SHORT_DECL, 0.25, true;
            GO_IMPORT, 0.25, false;
        ],
        "java" => patterns![
            JAVA_PUBLIC_CLASS, 0.30, true;
            JAVA_MAIN, 0.30, true;
            JAVA_SYSOUT, 0.20, false;
            JAVA_PRIVATE, 0.20, false;
        ],
        _ => &[],
    }
}

const LANGUAGES: &[&str] = &["cpp", "c", "typescript", "javascript", "python", "rust", "go", "java"];

/// Weighted keyword/shebang/marker scorer (§4.6 stage 2).
fn heuristic_detect(text: &str) -> Detection {
    let mut scores: Vec<(&'static str, f64, usize)> = LANGUAGES
        .iter()
        .map(|&language| {
            let patterns = language_patterns(language);
            let total_weight: f64 = patterns.iter().map(|p| p.weight).sum();
            let mut matched = 0.0;
            let mut unique_hits = 0;
            for pattern in patterns {
                if pattern.re.is_match(text) {
                    matched += pattern.weight;
                    if pattern.unique {
                        unique_hits += 1;
                    }
                }
            }
            let score = if total_weight > 0.0 { matched / total_weight } else { 0.0 };
            (language, score, unique_hits)
        })
        .collect();

    scores.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.2.cmp(&a.2))
    });

    let (language, score, _) = scores[0];
    Detection {
        language,
        confidence: score,
    }
}

fn has_unique_marker(language: &str, text: &str) -> bool {
    language_patterns(language)
        .iter()
        .any(|p| p.unique && p.re.is_match(text))
}
