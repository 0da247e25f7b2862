//! Error types for PaperAtlas.
//!
//! Library crates use [`PaperAtlasError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all PaperAtlas operations.
#[derive(Debug, thiserror::Error)]
pub enum PaperAtlasError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Checkpoint data exists on disk but cannot be parsed.
    ///
    /// Fatal for the run: proceeding would risk overwriting prior durable
    /// work with an empty snapshot.
    #[error("corrupt checkpoint store at {path:?}: {message}")]
    CorruptStore { path: PathBuf, message: String },

    /// Item source input error (unreadable or malformed CSV).
    #[error("source error: {message}")]
    Source { message: String },

    /// Annotation service failure, classified by kind.
    #[error("annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Per-call failure from the annotation service.
///
/// The client classifies but never retries; retry policy lives in the
/// enrichment engine so both pipelines share it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnnotationError {
    /// The call exceeded its per-call timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with HTTP 429.
    #[error("rate limited by annotation service")]
    RateLimited,

    /// The service responded but the payload failed schema validation.
    ///
    /// Distinguished from `Unreachable`/`Timeout` because an immediate
    /// retry is less likely to succeed without a context change.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Transport failure or non-success HTTP status.
    #[error("service unreachable: {0}")]
    Unreachable(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PaperAtlasError>;

impl PaperAtlasError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a source error from any displayable message.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a corrupt-store error for a given path.
    pub fn corrupt_store(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::CorruptStore {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PaperAtlasError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = PaperAtlasError::corrupt_store("/tmp/enriched.json", "unexpected EOF");
        assert!(err.to_string().contains("corrupt checkpoint store"));
        assert!(err.to_string().contains("unexpected EOF"));
    }

    #[test]
    fn annotation_error_converts() {
        let err: PaperAtlasError = AnnotationError::RateLimited.into();
        assert!(err.to_string().contains("rate limited"));
    }
}
