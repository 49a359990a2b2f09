//! Error types for rlm-assemble.
//!
//! A `thiserror`-based hierarchy: a top-level [`Error`] wraps one error enum
//! per subsystem via `#[from]`. Not every pipeline outcome is an `Error` —
//! "insufficient data" from the retriever and "fall back to deterministic
//! assembly" from the validator chain are first-class non-error results
//! (see the `retriever` and `assembler` modules); only genuine infrastructure
//! failure is represented here.

use thiserror::Error;

/// Result type alias for rlm-assemble operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for rlm-assemble operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Indexer errors (grammar setup, per-file failures propagated by a caller
    /// that chose not to swallow them).
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Retriever errors (index load failures other than "missing").
    #[error("retriever error: {0}")]
    Retriever(#[from] RetrieverError),

    /// Assembler errors (both deterministic and constrained paths).
    #[error("assembler error: {0}")]
    Assembler(#[from] AssemblerError),

    /// Verifier errors (write/compile-check failures).
    #[error("verifier error: {0}")]
    Verifier(#[from] VerifierError),

    /// I/O errors not otherwise wrapped by a subsystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors not otherwise wrapped.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors (CLI flags, environment).
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Indexer-specific errors (component C1).
#[derive(Error, Debug)]
pub enum IndexError {
    /// The AST grammar failed to load. Fatal: the indexer refuses all calls.
    #[error("grammar unavailable: {reason}")]
    GrammarUnavailable {
        /// Why the grammar could not be loaded.
        reason: String,
    },

    /// A source file could not be read. Recoverable: the caller should skip
    /// and continue with the remaining files.
    #[error("file unreadable: {path}: {source}")]
    FileUnreadable {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A source file failed to parse under the target grammar. Recoverable.
    #[error("parse failed: {path}: {reason}")]
    ParseFailed {
        /// Path that failed to parse.
        path: String,
        /// Diagnostic reason.
        reason: String,
    },

    /// The index could not be serialized or written to disk.
    #[error("failed to export index to {path}: {reason}")]
    ExportFailed {
        /// Path the index was being written to.
        path: String,
        /// Diagnostic reason (serialization or I/O failure).
        reason: String,
    },
}

/// Retriever-specific errors (component C2).
///
/// "Insufficient data" (empty salient-token-set or empty match-set) is *not*
/// an error — see [`crate::retriever::search`], which returns `Option<Vec<Chunk>>`.
#[derive(Error, Debug)]
pub enum RetrieverError {
    /// The index file exists but could not be parsed as JSON.
    #[error("index malformed: {path}: {source}")]
    IndexMalformed {
        /// Path of the malformed index file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Assembler-specific errors (components C3/C4).
///
/// `ModelUnavailable`, `ModelOutputMalformed`, and `ValidationFailed` are
/// deliberately absent here: per the error-handling design, any deviation of
/// the model from the strict contract degrades silently to the deterministic
/// assembler rather than propagating an error.
#[derive(Error, Debug)]
pub enum AssemblerError {
    /// The model client itself returned a transport-level failure (e.g. a
    /// network error from the LLM backend). This is distinct from the model
    /// producing unusable output, which falls back silently.
    #[error("model call failed: {0}")]
    ModelCallFailed(String),
}

/// Verifier-specific errors (component C5).
#[derive(Error, Debug)]
pub enum VerifierError {
    /// The assembled code could not be written to disk.
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The compile-only check reported a non-zero exit after the allotted
    /// re-prompt budget was exhausted.
    #[error("compile check failed after {attempts} attempt(s): {stderr}")]
    CompileFailed {
        /// Number of attempts made (1 = no re-prompt occurred).
        attempts: u32,
        /// Captured stderr from the final failing attempt.
        stderr: String,
    },

    /// The external compile checker could not be invoked at all (e.g. the
    /// interpreter binary is missing from `PATH`).
    #[error("compile checker unavailable: {0}")]
    CheckerUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_error_display() {
        let err = IndexError::GrammarUnavailable {
            reason: "no python grammar".to_string(),
        };
        assert_eq!(err.to_string(), "grammar unavailable: no python grammar");
    }

    #[test]
    fn verifier_compile_failed_display() {
        let err = VerifierError::CompileFailed {
            attempts: 2,
            stderr: "SyntaxError".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "compile check failed after 2 attempt(s): SyntaxError"
        );
    }

    #[test]
    fn error_wraps_index_error_via_from() {
        let index_err = IndexError::ParseFailed {
            path: "a.py".to_string(),
            reason: "bad token".to_string(),
        };
        let err: Error = index_err.into();
        assert!(matches!(err, Error::Index(_)));
    }
}
