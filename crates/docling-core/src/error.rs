//! Error taxonomy for the document model and processor pipeline.
//!
//! Errors split into two families: fatal errors abort the run (propagated with
//! `?` through [`Result`]), while recoverable errors are recorded on the
//! offending block's metadata and do not stop the pipeline. See
//! [`DoclingError::is_fatal`].

use thiserror::Error;

/// Errors that can occur while building, mutating, or rendering a [`crate::Document`].
#[derive(Error, Debug)]
pub enum DoclingError {
    /// A [`crate::block::BlockId`] referenced by `children`, `structure_refs`, or a
    /// breadcrumb does not resolve in the document's block index. Indicates an
    /// internal invariant violation; always fatal.
    #[error("unknown block id: {0}")]
    UnknownBlockId(String),

    /// A provider declined to handle the input entirely.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A provider's parser hit irrecoverable malformation in the input bytes.
    #[error("corrupted input: {0}")]
    CorruptedInput(String),

    /// A parallel code path inside a processor attempted to mutate the
    /// document while another traversal was in progress.
    #[error("concurrent mutation of document while iterating: {0}")]
    ConcurrentMutation(String),

    /// Per-table, recoverable: no table candidate reached the minimum viable
    /// score. The caller keeps the degraded table rather than propagating.
    #[error("table extraction failed for {table_id}: {reason}")]
    TableExtractionFailed {
        /// The table block's id.
        table_id: String,
        /// Human-readable cause.
        reason: String,
    },

    /// Per-block, recoverable: language detection exceeded its time budget.
    #[error("language detection timed out for block {0}")]
    LanguageDetectionTimeout(String),

    /// Recoverable: an outbound call (LLM, model inference) failed after
    /// exhausting retries. The caller falls back to the heuristic result.
    #[error("external call failed: {0}")]
    ExternalCallFailed(String),

    /// Cooperative shutdown requested via a cancellation token. Not reported
    /// to the user as an error; propagates to unwind in-flight processor work.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O failure reading/writing a file.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Catch-all for provider/processor errors that don't fit a narrower
    /// variant, wrapping the underlying cause chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DoclingError {
    /// Whether this error must abort the pipeline, versus being recorded as a
    /// recoverable condition in block metadata.
    ///
    /// Per the error taxonomy: `UnsupportedFormat`, `CorruptedInput`,
    /// `UnknownBlockId`, and `ConcurrentMutation` are fatal. `TableExtractionFailed`,
    /// `LanguageDetectionTimeout`, and `ExternalCallFailed` are recoverable.
    /// `Cancelled` is neither — it's a propagating shutdown signal, not a
    /// user-facing error.
    #[must_use = "check whether this error should abort the pipeline"]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownBlockId(_)
                | Self::UnsupportedFormat(_)
                | Self::CorruptedInput(_)
                | Self::ConcurrentMutation(_)
        )
    }

    /// Stable short code recorded in `metadata.error_code` for recoverable errors.
    #[must_use = "returns the stable error code string"]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownBlockId(_) => "UnknownBlockId",
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::CorruptedInput(_) => "CorruptedInput",
            Self::ConcurrentMutation(_) => "ConcurrentMutation",
            Self::TableExtractionFailed { .. } => "TableExtractionFailed",
            Self::LanguageDetectionTimeout(_) => "LanguageDetectionTimeout",
            Self::ExternalCallFailed(_) => "ExternalCallFailed",
            Self::Cancelled => "Cancelled",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::Other(_) => "Other",
        }
    }
}

/// Convenience alias used throughout the core and pipeline crates.
pub type Result<T> = std::result::Result<T, DoclingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_classified_correctly() {
        assert!(DoclingError::UnknownBlockId("1_table_0".into()).is_fatal());
        assert!(DoclingError::UnsupportedFormat("rtf".into()).is_fatal());
        assert!(DoclingError::CorruptedInput("bad xref".into()).is_fatal());
        assert!(DoclingError::ConcurrentMutation("iter".into()).is_fatal());
    }

    #[test]
    fn recoverable_errors_classified_correctly() {
        assert!(!DoclingError::TableExtractionFailed {
            table_id: "1_table_0".into(),
            reason: "no candidate".into()
        }
        .is_fatal());
        assert!(!DoclingError::LanguageDetectionTimeout("1_code_0".into()).is_fatal());
        assert!(!DoclingError::ExternalCallFailed("llm unreachable".into()).is_fatal());
        assert!(!DoclingError::Cancelled.is_fatal());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(DoclingError::Cancelled.code(), "Cancelled");
        assert_eq!(
            DoclingError::LanguageDetectionTimeout("x".into()).code(),
            "LanguageDetectionTimeout"
        );
    }
}
