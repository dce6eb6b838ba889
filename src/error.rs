//! Crate-wide error taxonomy. Subsystem-local errors (e.g.
//! [`crate::config::ConfigError`]) convert into [`AnteaterError`] via
//! `#[from]`; callers at the CLI boundary match on this enum to pick an
//! exit code and a message, never on the inner subsystem error directly.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AnteaterError {
    /// Missing path, unreadable file, or malformed configuration —
    /// reported at the CLI boundary, exit non-zero.
    #[error("input error: {0}")]
    Input(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A single file could not be parsed/resolved. Carried as
    /// [`crate::project::FileAnalysisResult::error`] rather than aborting
    /// the run; this variant exists for callers that must surface it
    /// directly (e.g. a single-file CLI invocation).
    #[error("failed to analyze {path}: {message}")]
    FileAnalysis { path: String, message: String },

    /// A single lint rule failed during traversal. Demoted to a
    /// warning-severity violation by [`crate::project::ProjectAnalyzer`]
    /// rather than propagated; this variant is for direct rule-API use.
    #[error("rule analysis failed: {0}")]
    RuleExecution(String),

    /// The Datalog engine or abstract interpreter hit its iteration cap.
    /// Not necessarily fatal — callers should read `iterations` and
    /// degrade to "unknown" rather than trust the (possibly incomplete)
    /// result as if it reached a true fixed point.
    #[error("iteration cap ({iterations}) reached before a fixed point")]
    IterationCapReached { iterations: u64 },

    /// The embedding cache file was unreadable or malformed. Recovered
    /// locally by [`crate::cache::EmbeddingCache::load`] (starts empty);
    /// this variant is for callers that want to log the event.
    #[error("embedding cache at {path} is corrupt, starting empty: {message}")]
    CacheCorruption { path: String, message: String },

    /// Out-of-memory or an I/O failure persisting the cache — not
    /// locally recoverable, surfaced to the caller.
    #[error("fatal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnteaterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_analysis_error_formats_path_and_message() {
        let err = AnteaterError::FileAnalysis { path: "a.dart".to_string(), message: "bad token".to_string() };
        assert_eq!(err.to_string(), "failed to analyze a.dart: bad token");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AnteaterError = io_err.into();
        assert!(matches!(err, AnteaterError::Io(_)));
    }
}
