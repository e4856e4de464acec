//! Error types for merge-session edits.

use ns_common::SpanId;
use thiserror::Error;

/// Result type for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors that can occur while editing a merge session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    /// The session has been finalized; re-detect to edit again.
    #[error("session is finalized; re-run detection to edit spans")]
    SessionFinalized,

    /// A manual span with a zero-length or inverted range.
    #[error("invalid span range [{start}, {end})")]
    InvalidSpan { start: usize, end: usize },

    /// An edit referenced a span id that is not in the session.
    #[error("unknown span id: {0}")]
    UnknownSpan(SpanId),
}
