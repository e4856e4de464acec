//! Pipeline-level error types.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced at the pipeline boundary.
///
/// Detector failures never appear here: they degrade to pattern-only
/// results and are reported through the session's model status.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The bundle anchor date could not be resolved.
    #[error("invalid anchor date: {0}")]
    InvalidAnchor(String),

    /// A session edit failed.
    #[error(transparent)]
    Merge(#[from] ns_merge::MergeError),

    /// Bundle assembly or submission failed.
    #[error(transparent)]
    Bundle(#[from] ns_bundle::BundleError),
}
