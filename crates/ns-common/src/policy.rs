//! Merge policy supplied by the caller.
//!
//! The pipeline never reads configuration from ambient state; the caller
//! resolves environment/storage once and injects a `MergePolicy` value
//! into every entry point.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the merge engine combines spans from the two detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Keep every span from both detectors; removal only by explicit
    /// exclusion. Preserves recall until an operator vetoes a span.
    Union,
    /// Overlapping spans collapse to the higher-confidence one.
    BestOf,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Union => write!(f, "union"),
            MergeMode::BestOf => write!(f, "best_of"),
        }
    }
}

/// Immutable per-run merge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePolicy {
    /// Merge mode.
    pub mode: MergeMode,

    /// Spans below this confidence are dropped before merging.
    /// Manual spans are exempt.
    pub confidence_threshold: f64,

    /// When true, provider/clinician-name spans are excluded from the
    /// merged set instead of being treated as ordinary PHI.
    pub protect_providers: bool,
}

impl MergePolicy {
    /// Policy with the given mode and default threshold.
    pub fn new(mode: MergeMode) -> Self {
        MergePolicy {
            mode,
            ..MergePolicy::default()
        }
    }

    /// Set the confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the provider-protection flag.
    pub fn with_protect_providers(mut self, protect: bool) -> Self {
        self.protect_providers = protect;
        self
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy {
            mode: MergeMode::Union,
            confidence_threshold: 0.5,
            protect_providers: false,
        }
    }
}
