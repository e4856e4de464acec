//! Error types for bundle operations.

use thiserror::Error;

/// Errors that can occur during bundle assembly and submission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BundleError {
    /// A sequence number was used by more than one document.
    #[error("duplicate sequence number {sequence} in bundle")]
    DuplicateSequence { sequence: u32 },

    /// A document's day offset could not be resolved (anchor or
    /// document date missing/unparseable).
    #[error("document '{document}' has no resolvable day offset: {reason}")]
    MissingOffset { document: String, reason: String },

    /// Residual date-like text survived redaction; submission blocked.
    #[error("leak scan failed: {count} residual date-like match(es) in: {}", .documents.join(", "))]
    LeakDetected {
        count: usize,
        documents: Vec<String>,
    },

    /// Sequence numbers start at 1.
    #[error("sequence number must be positive")]
    ZeroSequence,

    /// A role must be non-empty to build a header token.
    #[error("document role must not be empty")]
    EmptyRole,

    /// Nothing to submit.
    #[error("bundle has no documents")]
    EmptyBundle,
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;
